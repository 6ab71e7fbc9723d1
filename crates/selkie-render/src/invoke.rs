//! Layout sessions.
//!
//! The engine is not reentrant, so every session (graph construction, layout run and read-back)
//! holds one process-wide lock. The engine context lives exactly as long as the session.

use crate::builder::inches;
use crate::config::RenderConfig;
use crate::{Error, Result};
use lamantin::{Context, SubgraphId};
use selkie_core::RankDir;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

static LAYOUT_LOCK: Mutex<()> = Mutex::new(());

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs `f` with a fresh engine context while holding the layout lock.
///
/// The lock is released and the context closed on every path, including a panic inside `f`,
/// which is reported as [`Error::EnginePanic`]. A lock poisoned by an earlier panic is reused.
pub fn with_layout_session<T>(f: impl FnOnce(&mut Context) -> Result<T>) -> Result<T> {
    let _guard = LAYOUT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut ctx = Context::open();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut ctx)));
    ctx.close();
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload);
            tracing::error!(%message, "layout session panicked");
            Err(Error::EnginePanic { message })
        }
    }
}

/// Applies the rank direction and spacing overrides, then lays out `graph`.
pub fn run_layout(
    ctx: &mut Context,
    graph: SubgraphId,
    rankdir: RankDir,
    config: &RenderConfig,
) -> Result<()> {
    if rankdir == RankDir::LeftToRight {
        ctx.set_attr(graph, "rankdir", "LR")?;
    }
    if let Some(nodesep) = config.nodesep {
        ctx.set_attr(graph, "nodesep", &nodesep.to_string())?;
    }
    if let Some(ranksep) = config.ranksep {
        ctx.set_attr(graph, "ranksep", &ranksep.to_string())?;
    }
    ctx.layout(graph)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_are_reported_and_the_lock_released() {
        let err = with_layout_session::<()>(|_| panic!("engine exploded")).unwrap_err();
        assert!(matches!(err, Error::EnginePanic { ref message } if message == "engine exploded"));

        let value = with_layout_session(|ctx| {
            let g = ctx.open_graph("g");
            let n = ctx.create_node(g, "n")?;
            ctx.set_attr(n, "width", &inches(72.0))?;
            run_layout(ctx, g, RankDir::LeftToRight, &RenderConfig::default())?;
            Ok(ctx.attr(g, "rankdir").map(str::to_string))
        })
        .unwrap();
        assert_eq!(value.as_deref(), Some("LR"));
    }

    #[test]
    fn engine_errors_propagate() {
        let err = with_layout_session(|ctx| {
            let g = ctx.open_graph("g");
            let config = RenderConfig {
                nodesep: Some(-1.0),
                ..RenderConfig::default()
            };
            run_layout(ctx, g, RankDir::TopToBottom, &config)
        })
        .unwrap_err();
        assert!(matches!(err, Error::Layout(lamantin::Error::InvalidAttribute { .. })));
    }
}
