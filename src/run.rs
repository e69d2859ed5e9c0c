//! Drivers on top of the reactive executor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use crate::error::{Error, ExecError, InternalResult};
use crate::eval::Executor;
use crate::program::{Primitive, Program, RawResult};
use crate::runtime::Runtime;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Starts a long-lived run. `callback` fires for every result, including
/// later updates, until the returned executor is unregistered or dropped.
#[instrument(level = "debug", skip_all, fields(callpoints = program.callpoint_count()))]
pub fn run<F>(
    runtime: &Runtime,
    program: Arc<Program>,
    props: HashMap<String, Primitive>,
    callback: F,
) -> InternalResult<Executor>
where
    F: Fn(RawResult) + Send + Sync + 'static,
{
    let executor = Executor::new(runtime.clone(), program, props, move |_, result| {
        callback(result)
    })?;
    executor.run();
    Ok(executor)
}

/// Reports `error` for every entrypoint and datapoint without evaluating.
#[instrument(level = "debug", skip_all, fields(error = %error))]
pub fn no_run<F>(
    runtime: &Runtime,
    program: Arc<Program>,
    error: ExecError,
    props: HashMap<String, Primitive>,
    callback: F,
) -> InternalResult<Executor>
where
    F: Fn(RawResult) + Send + Sync + 'static,
{
    let executor = Executor::new(runtime.clone(), program, props, move |_, result| {
        callback(result)
    })?;
    executor.no_run(error);
    Ok(executor)
}

/// Runs until one result per entrypoint and datapoint has arrived.
///
/// The last delivery carries `is_done = true`; all watches are removed before
/// it is made and nothing is delivered afterwards.
#[instrument(level = "debug", skip_all, fields(callpoints = program.callpoint_count()))]
pub fn run_once<F>(
    runtime: &Runtime,
    program: Arc<Program>,
    props: HashMap<String, Primitive>,
    callback: F,
) -> InternalResult<Executor>
where
    F: Fn(RawResult, bool) + Send + Sync + 'static,
{
    let target = program.callpoint_count();
    // held across unregister and the callback so the done delivery is last
    let delivered = Mutex::new(0usize);

    let executor = Executor::new(runtime.clone(), program, props, move |executor, result| {
        let mut n = lock(&delivered);
        if *n >= target {
            debug!(code_id = %result.code_id, "run> dropping result after completion");
            return;
        }
        *n += 1;
        let is_done = *n == target;
        if is_done {
            executor.unregister();
        }
        callback(result, is_done);
    })?;
    executor.run();
    Ok(executor)
}

fn collecting() -> (
    Arc<Mutex<Vec<RawResult>>>,
    oneshot::Receiver<()>,
    impl Fn(RawResult, bool) + Send + Sync + 'static,
) {
    let results = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));

    let sink = results.clone();
    let callback = move |result: RawResult, is_done: bool| {
        lock(&sink).push(result);
        if is_done {
            if let Some(tx) = lock(&tx).take() {
                let _ = tx.send(());
            }
        }
    };
    (results, rx, callback)
}

/// Blocks the calling thread until the run completes and returns every
/// delivered result in delivery order.
///
/// Must not be called from inside an async runtime; use
/// [`run_once_async`] there.
#[instrument(level = "debug", skip_all, fields(callpoints = program.callpoint_count()))]
pub fn run_once_sync(
    runtime: &Runtime,
    program: Arc<Program>,
    props: HashMap<String, Primitive>,
) -> InternalResult<Vec<RawResult>> {
    let empty = program.callpoint_count() == 0;
    let (results, rx, callback) = collecting();

    let executor = run_once(runtime, program, props, callback)?;
    if !empty {
        rx.blocking_recv()
            .map_err(|e| Error::Channel(e.to_string()))?;
    }
    drop(executor);

    let results = std::mem::take(&mut *lock(&results));
    Ok(results)
}

/// Like [`run_once_sync`], awaiting completion for at most
/// `EngineConfig::result_timeout`.
#[instrument(level = "debug", skip_all, fields(callpoints = program.callpoint_count()))]
pub async fn run_once_async(
    runtime: &Runtime,
    program: Arc<Program>,
    props: HashMap<String, Primitive>,
) -> InternalResult<Vec<RawResult>> {
    let empty = program.callpoint_count() == 0;
    let deadline = runtime.config.result_timeout;
    let (results, rx, callback) = collecting();

    let executor = run_once(runtime, program, props, callback)?;
    if !empty {
        match tokio::time::timeout(deadline, rx).await {
            Ok(received) => received.map_err(|e| Error::Channel(e.to_string()))?,
            Err(_) => {
                warn!(?deadline, "run> timed out waiting for results");
                executor.unregister();
                return Err(Error::Timeout(deadline));
            }
        }
    }
    drop(executor);

    let results = std::mem::take(&mut *lock(&results));
    Ok(results)
}
