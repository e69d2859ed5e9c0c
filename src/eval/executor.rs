use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{ExecError, ExecResult, ProgramError};
use crate::program::{Call, Chunk, Primitive, Program, RawData, RawResult, Ref, Value};
use crate::registry::Resolution;
use crate::runtime::Runtime;
use crate::types::Type;

/// Receives every resolved entrypoint and datapoint.
pub(crate) type Sink = Box<dyn Fn(&Executor, Ref, RawResult) + Send + Sync>;

pub(crate) struct ExecutorState {
    pub(crate) id: String,
    pub(crate) runtime: Runtime,
    pub(crate) program: Arc<Program>,
    pub(crate) props: Arc<HashMap<String, Primitive>>,
    /// Bound value of ref 1 when running a block function.
    pub(crate) seed: Option<RawData>,
    pub(crate) callpoints: HashMap<Ref, String>,
    pub(crate) cache: DashMap<Ref, RawData>,
    pub(crate) dependents: DashMap<Ref, HashSet<Ref>>,
    pub(crate) started: DashSet<Ref>,
    pub(crate) watchers: DashSet<String>,
    pub(crate) blocks: DashMap<Ref, Vec<Executor>>,
    pub(crate) sink: Sink,
    pub(crate) closed: AtomicBool,
}

impl Drop for ExecutorState {
    fn drop(&mut self) {
        if *self.closed.get_mut() {
            return;
        }
        for wid in self.watchers.iter() {
            self.runtime.graph.unregister(wid.key());
        }
    }
}

/// Reactive evaluator for one program run.
///
/// Construction never evaluates anything. Results start flowing to the
/// callback after [`Executor::run`], so the callback always receives a valid
/// handle to the executor it belongs to.
#[derive(Clone)]
pub struct Executor {
    pub(crate) state: Arc<ExecutorState>,
}

impl Executor {
    pub fn new<F>(
        runtime: Runtime,
        program: Arc<Program>,
        props: HashMap<String, Primitive>,
        callback: F,
    ) -> Result<Self, ProgramError>
    where
        F: Fn(&Executor, RawResult) + Send + Sync + 'static,
    {
        program.validate()?;
        Self::build(
            runtime,
            program,
            Arc::new(props),
            None,
            Box::new(move |executor, _, result| callback(executor, result)),
        )
    }

    pub(crate) fn build(
        runtime: Runtime,
        program: Arc<Program>,
        props: Arc<HashMap<String, Primitive>>,
        seed: Option<RawData>,
        sink: Sink,
    ) -> Result<Self, ProgramError> {
        let callpoints = program
            .callpoints()
            .map(|reference| Ok((reference, program.checksum(reference)?.to_string())))
            .collect::<Result<HashMap<_, _>, ProgramError>>()?;

        Ok(Self {
            state: Arc::new(ExecutorState {
                id: Uuid::new_v4().to_string(),
                runtime,
                program,
                props,
                seed,
                callpoints,
                cache: DashMap::new(),
                dependents: DashMap::new(),
                started: DashSet::new(),
                watchers: DashSet::new(),
                blocks: DashMap::new(),
                sink,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.state.program
    }

    pub fn runtime(&self) -> &Runtime {
        &self.state.runtime
    }

    /// Checksum of any ref the program has one for.
    pub fn checksum(&self, reference: Ref) -> Option<String> {
        self.state.program.checksums.get(&reference).cloned()
    }

    /// Latest known value of a ref.
    pub fn cached(&self, reference: Ref) -> Option<RawData> {
        self.state
            .cache
            .get(&reference)
            .map(|entry| entry.value().clone())
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Number of active watches registered by this executor and its blocks.
    pub fn watcher_count(&self) -> usize {
        let children: usize = self
            .state
            .blocks
            .iter()
            .map(|entry| entry.value().iter().map(Executor::watcher_count).sum::<usize>())
            .sum();
        self.state.watchers.len() + children
    }

    /// Starts resolving every entrypoint and datapoint.
    pub fn run(&self) {
        debug!(
            executor = %self.state.id,
            callpoints = self.state.callpoints.len(),
            "exec> run"
        );
        let callpoints: Vec<Ref> = self.state.program.callpoints().collect();
        for reference in callpoints {
            self.ensure_started(reference);
        }
    }

    /// Reports `error` for every entrypoint and datapoint without
    /// evaluating anything.
    pub fn no_run(&self, error: ExecError) {
        debug!(executor = %self.state.id, error = %error, "exec> no run");
        for reference in self.state.program.callpoints() {
            if self.is_closed() {
                return;
            }
            if let Some(code_id) = self.state.callpoints.get(&reference) {
                (self.state.sink)(
                    self,
                    reference,
                    RawResult::error(error.clone(), code_id.clone()),
                );
            }
        }
    }

    /// Stops all watches and discards any later update. Idempotent.
    pub fn unregister(&self) {
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let watchers: Vec<String> = self
            .state
            .watchers
            .iter()
            .map(|wid| wid.key().clone())
            .collect();
        for wid in watchers {
            debug!(wid = %wid, "exec> remove watcher id");
            self.state.watchers.remove(&wid);
            self.state.runtime.graph.unregister(&wid);
        }

        let children: Vec<Executor> = self
            .state
            .blocks
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        self.state.blocks.clear();
        for child in children {
            child.unregister();
        }
    }

    pub(crate) fn ensure_started(&self, reference: Ref) {
        if self.state.started.insert(reference) {
            self.run_chain(reference);
        }
    }

    pub(crate) fn run_chain(&self, reference: Ref) {
        if self.is_closed() {
            return;
        }
        trace!(executor = %self.state.id, reference, "exec> run chain");

        match self.resolve(reference) {
            Ok(Resolution::Value(data)) => self.publish(reference, data),
            Ok(Resolution::Suspend(dependency)) => {
                trace!(reference, dependency, "exec> suspend");
                self.ensure_started(dependency);
            }
            Ok(Resolution::Pending) => {}
            Err(err) => {
                debug!(reference, error = %err, "exec> ref failed");
                self.publish(reference, RawData::error(Type::Nil, err));
            }
        }
    }

    /// Caches a ref's value and runs the trigger chain for it.
    pub(crate) fn publish(&self, reference: Ref, data: RawData) {
        if self.is_closed() {
            return;
        }
        self.state.cache.insert(reference, data);
        self.trigger_chain(reference);
    }

    /// Reports the ref if it is a callpoint, then re-runs every ref that has
    /// read it.
    pub(crate) fn trigger_chain(&self, reference: Ref) {
        if self.is_closed() {
            return;
        }

        if let Some(code_id) = self.state.callpoints.get(&reference) {
            if let Some(data) = self.cached(reference) {
                (self.state.sink)(self, reference, RawResult::new(data, code_id.clone()));
            }
        }

        let dependents: Vec<Ref> = self
            .state
            .dependents
            .get(&reference)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default();
        for dependent in dependents {
            self.run_chain(dependent);
        }
    }

    /// Value of `dependency` as read by `reader`. Errors propagate to the
    /// reader; `None` means not resolved yet.
    fn read_ref(&self, dependency: Ref, reader: Ref) -> ExecResult<Option<RawData>> {
        self.state
            .dependents
            .entry(dependency)
            .or_default()
            .insert(reader);

        match self.cached(dependency) {
            Some(RawData {
                error: Some(err), ..
            }) => Err(err),
            other => Ok(other),
        }
    }

    fn resolve(&self, reference: Ref) -> ExecResult<Resolution> {
        if reference == 1 {
            if let Some(seed) = &self.state.seed {
                return Ok(Resolution::Value(seed.clone()));
            }
        }

        let program = self.state.program.clone();
        match program.chunk(reference)? {
            Chunk::Primitive(primitive) => match primitive.value {
                Value::Ref(dependency) => Ok(match self.read_ref(dependency, reference)? {
                    Some(data) => Resolution::Value(data),
                    None => Resolution::Suspend(dependency),
                }),
                _ => Ok(Resolution::Value(primitive.raw_data())),
            },
            Chunk::Property { name } => self
                .state
                .props
                .get(name)
                .map(|primitive| Resolution::Value(primitive.raw_data()))
                .ok_or_else(|| ExecError::MissingProperty(name.clone())),
            Chunk::Call(call) => self.resolve_call(call, reference),
        }
    }

    fn resolve_call(&self, call: &Call, reference: Ref) -> ExecResult<Resolution> {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            match arg.value {
                Value::Ref(dependency) => match self.read_ref(dependency, reference)? {
                    Some(data) => args.push(data),
                    None => return Ok(Resolution::Suspend(dependency)),
                },
                _ => args.push(arg.raw_data()),
            }
        }

        let Some(binding) = call.binding else {
            return self.create_resource(call, &args);
        };
        let bind = match self.read_ref(binding, reference)? {
            Some(bind) => bind,
            None => return Ok(Resolution::Suspend(binding)),
        };

        let ty = bind.runtime_type();
        let operand = args.first().map(RawData::runtime_type);
        match self
            .state
            .runtime
            .registry
            .lookup(&ty, &call.id, operand.as_ref())
        {
            Ok(handler) => {
                trace!(reference, id = %call.id, ty = %ty, "exec> run bound function");
                handler.call(self, &bind, call, &args, reference)
            }
            Err(_) if ty.is_resource() => self.watch_field(&bind, call, reference),
            Err(err) => Err(err.into()),
        }
    }

    /// Unbound calls construct a resource from name/value argument pairs.
    fn create_resource(&self, call: &Call, args: &[RawData]) -> ExecResult<Resolution> {
        if args.len() % 2 != 0 {
            return Err(ExecError::operator(
                &call.id,
                "resource arguments must come in name/value pairs",
            ));
        }

        let mut pairs = Vec::with_capacity(args.len() / 2);
        for pair in args.chunks(2) {
            let name = pair[0]
                .value
                .as_str()
                .ok_or_else(|| ExecError::binding("string", pair[0].value.kind()))?;
            pairs.push((name.to_string(), Primitive::from(pair[1].clone())));
        }

        let handle = self
            .state
            .runtime
            .graph
            .create_resource(&call.id, pairs)
            .map_err(|e| {
                ExecError::registration(format!("cannot create resource '{}': {}", call.id, e))
            })?;
        debug!(resource = %handle, "exec> created resource");
        Ok(Resolution::Value(RawData::new(
            handle.resource_type(),
            Value::Resource(handle),
        )))
    }
}
