//! Abstractions for offset pagination.

/// Pagination arguments: 1-based page number and page size.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Arguments {
    /// 1-based number of the requested page.
    page: usize,

    /// Maximum number of items on a page.
    limit: usize,
}

impl Arguments {
    /// Upper bound of [`Arguments::limit()`].
    pub const MAX_LIMIT: usize = 100;

    /// Creates new [`Arguments`].
    ///
    /// Missing `page` defaults to the first one and missing `limit` to the
    /// provided `default`. [`None`] is returned if `page` is zero, or
    /// `limit` is zero or exceeds [`Arguments::MAX_LIMIT`].
    pub fn new<Num>(
        page: Option<Num>,
        limit: Option<Num>,
        default: usize,
    ) -> Option<Self>
    where
        Num: TryInto<usize>,
    {
        let page = page.map_or(Some(1), |p| p.try_into().ok())?;
        let limit = limit.map_or(Some(default), |l| l.try_into().ok())?;
        (page > 0 && limit > 0 && limit <= Self::MAX_LIMIT)
            .then_some(Self { page, limit })
    }

    /// Returns 1-based number of the requested page.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Returns maximum number of items on the requested page.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns number of items preceding the requested page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.page - 1) * self.limit
    }
}

/// A page of items.
#[derive(Clone, Debug)]
pub struct Page<I> {
    /// Items on this [`Page`].
    pub items: Vec<I>,

    /// [`Arguments`] this [`Page`] was selected with.
    pub arguments: Arguments,

    /// Total number of items across all pages.
    pub total: usize,
}

impl<I> Page<I> {
    /// Returns total number of pages.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.arguments.limit)
    }

    /// Indicates whether there is a page after this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.arguments.page < self.total_pages()
    }

    /// Maps items of this [`Page`] with the provided function.
    #[must_use]
    pub fn map<T>(self, f: impl FnMut(I) -> T) -> Page<T> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            arguments: self.arguments,
            total: self.total,
        }
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($node:ty, $filter:ty) => {
        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, Page};

    #[test]
    fn validates_arguments() {
        assert_eq!(
            Arguments::new(None::<i32>, None, 20),
            Some(Arguments { page: 1, limit: 20 }),
        );
        assert_eq!(
            Arguments::new(Some(3), Some(10), 20),
            Some(Arguments { page: 3, limit: 10 }),
        );
        assert_eq!(Arguments::new(Some(0), None, 20), None);
        assert_eq!(Arguments::new(Some(-1), None, 20), None);
        assert_eq!(Arguments::new(None, Some(0), 20), None);
        assert_eq!(Arguments::new(None, Some(101), 20), None);
    }

    #[test]
    fn calculates_offset() {
        let args = Arguments::new(Some(3), Some(10), 20).unwrap();

        assert_eq!(args.offset(), 20);
    }

    #[test]
    fn counts_pages() {
        let arguments = Arguments::new(Some(2), Some(10), 20).unwrap();
        let page = Page {
            items: vec![1; 10],
            arguments,
            total: 21,
        };

        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let last = Page {
            items: vec![1],
            arguments: Arguments::new(Some(3), Some(10), 20).unwrap(),
            total: 21,
        };
        assert!(!last.has_next());
    }
}
