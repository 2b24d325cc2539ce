//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use derive_more::Display;
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing::Instrument as _;

#[cfg(doc)]
use crate::Task;

/// Background environment for running [`Task`]s.
///
/// Spawned [`Task`]s make no progress until the [`Background`] is awaited.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Names and handles of spawned tasks.
    handles: Vec<(&'static str, task::JoinHandle<Result<(), Failure>>)>,
}

impl Background {
    /// Spawns a new [`Task`] with the provided `name` inside the
    /// [`Background`] environment.
    ///
    /// Everything the [`Task`] logs is attributed to its `name`.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        let handle = self.set.spawn_local(
            future
                .map_err(move |e| Failure {
                    task: name,
                    source: Box::new(e),
                })
                .instrument(tracing::info_span!("task", task.name = name)),
        );
        self.handles.push((name, handle));
    }

    /// Returns the names of the spawned [`Task`]s.
    #[must_use]
    pub fn tasks(&self) -> Vec<&'static str> {
        self.handles.iter().map(|(name, _)| *name).collect()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            handles.into_iter().map(|(name, h)| {
                h.map(move |r| match r {
                    Ok(res) => res,
                    Err(e) => Err(Failure {
                        task: name,
                        source: Box::new(e),
                    }),
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}

/// Failure of a [`Task`] running in a [`Background`].
#[derive(Debug, Display)]
#[display("`{task}` task failed: {source}")]
pub struct Failure {
    /// Name of the failed [`Task`].
    pub task: &'static str,

    /// Cause of the failure.
    source: Box<dyn Error + 'static>,
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

#[cfg(test)]
mod spec {
    use std::{fmt, future::IntoFuture as _};

    use super::Background;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[tokio::test]
    async fn reports_failed_task_by_name() {
        let mut bg = Background::default();
        bg.spawn("Idle", async { Ok::<_, Boom>(()) });
        bg.spawn("Broken", async { Err::<(), _>(Boom) });
        assert_eq!(bg.tasks(), ["Idle", "Broken"]);

        let failure = bg.into_future().await.unwrap_err();

        assert_eq!(failure.task, "Broken");
        assert_eq!(failure.to_string(), "`Broken` task failed: boom");
    }

    #[tokio::test]
    async fn completes_when_all_tasks_do() {
        let mut bg = Background::default();
        bg.spawn("First", async { Ok::<_, Boom>(()) });
        bg.spawn("Second", async { Ok::<_, Boom>(()) });

        bg.into_future().await.unwrap();
    }
}
