//! Concurrent scene startup.
//!
//! The room model, the physics world and (in development) the debug layer are
//! independent of each other and load at the same time. The scene is only
//! assembled once every one of them is available.

use std::future::Future;

/// Everything the scene needs before its first frame.
#[derive(Debug)]
pub struct StartupOutput<A, P, D> {
    pub asset: A,
    pub physics: P,
    /// `None` when no debug tooling was requested.
    pub debug: Option<D>,
}

/// Drive the three startup tasks concurrently.
///
/// Resolves once all of them finished. The first error ends the join and is
/// returned; results of the other tasks are dropped.
pub async fn join<A, P, D>(
    asset: impl Future<Output = anyhow::Result<A>>,
    physics: impl Future<Output = anyhow::Result<P>>,
    debug: Option<impl Future<Output = anyhow::Result<D>>>,
) -> anyhow::Result<StartupOutput<A, P, D>> {
    let debug = async move {
        match debug {
            Some(load) => load.await.map(Some),
            None => Ok(None),
        }
    };
    let (asset, physics, debug) = futures::try_join!(asset, physics, debug)?;
    Ok(StartupOutput {
        asset,
        physics,
        debug,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;
    use futures::{channel::oneshot, executor::block_on, future::ready};

    use super::*;

    #[test]
    fn debug_is_absent_without_a_loader() {
        let out = block_on(join(
            ready(Ok("room")),
            ready(Ok(1)),
            None::<futures::future::Ready<anyhow::Result<()>>>,
        ))
        .unwrap();
        assert_eq!(out.asset, "room");
        assert_eq!(out.physics, 1);
        assert!(out.debug.is_none());
    }

    #[test]
    fn waits_for_the_slowest_task() {
        let (tx, rx) = oneshot::channel::<u32>();
        let physics_done = Cell::new(false);
        let startup = join(
            async { rx.await.map_err(anyhow::Error::from) },
            async {
                physics_done.set(true);
                anyhow::Ok(())
            },
            Some(async { anyhow::Ok("debug") }),
        );
        let release = async {
            assert!(physics_done.get());
            tx.send(7).unwrap();
        };
        let (out, ()) = block_on(async { futures::join!(startup, release) });
        let out = out.unwrap();
        assert_eq!(out.asset, 7);
        assert_eq!(out.debug, Some("debug"));
    }

    #[test]
    fn any_failure_fails_the_join() {
        let err = block_on(join(
            ready(Ok(())),
            ready(Err::<(), _>(anyhow!("no physics"))),
            Some(ready(Ok(()))),
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "no physics");

        let err = block_on(join(
            ready(Ok(())),
            ready(Ok(())),
            Some(ready(Err::<(), _>(anyhow!("no inspector")))),
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "no inspector");
    }
}
