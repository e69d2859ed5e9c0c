use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use super::executor::{Executor, ExecutorState};
use crate::error::{ExecError, ExecResult};
use crate::program::{RawData, RawResult, Ref, Value};
use crate::registry::Resolution;

/// Results of one block function run against one bound element.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOutcome {
    pub item: RawData,
    pub results: Vec<RawResult>,
}

impl BlockOutcome {
    pub fn error(&self) -> Option<&ExecError> {
        self.results
            .iter()
            .find_map(|result| result.data.error.as_ref())
    }

    /// Every block result is truthy.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|result| result.data.is_truthy())
    }

    /// Block results keyed by checksum.
    pub fn entries(&self) -> Value {
        Value::Map(
            self.results
                .iter()
                .map(|result| (result.code_id.clone(), result.data.value.clone()))
                .collect(),
        )
    }
}

type Finish = Box<dyn Fn(&[BlockOutcome]) -> RawData + Send + Sync>;

struct Slot {
    item: RawData,
    results: BTreeMap<Ref, RawResult>,
}

impl Slot {
    fn outcome(&self) -> BlockOutcome {
        BlockOutcome {
            item: self.item.clone(),
            results: self.results.values().cloned().collect(),
        }
    }
}

/// Gathers child results and publishes the parent ref once every child has
/// reported every callpoint, then again on each later update.
struct Collector {
    parent: Weak<ExecutorState>,
    reference: Ref,
    expected: usize,
    slots: Mutex<Vec<Slot>>,
    finish: Finish,
}

impl Collector {
    fn record(&self, slot: usize, reference: Ref, result: RawResult) {
        let outcomes: Vec<BlockOutcome> = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get_mut(slot) {
                slot.results.insert(reference, result);
            }
            if !slots.iter().all(|slot| slot.results.len() >= self.expected) {
                return;
            }
            slots.iter().map(Slot::outcome).collect()
        };

        let Some(state) = self.parent.upgrade() else {
            return;
        };
        debug!(reference = self.reference, items = outcomes.len(), "exec> block finished");
        let data = (self.finish)(&outcomes);
        Executor { state }.publish(self.reference, data);
    }
}

impl Executor {
    /// Runs block function `function` once per item and resolves `reference`
    /// with `finish` over all outcomes.
    pub fn run_blocks<F>(
        &self,
        reference: Ref,
        function: Ref,
        items: Vec<RawData>,
        finish: F,
    ) -> ExecResult<Resolution>
    where
        F: Fn(&[BlockOutcome]) -> RawData + Send + Sync + 'static,
    {
        let limit = self.state.runtime.config.max_block_items;
        if items.len() > limit {
            return Err(ExecError::operator(
                "{}",
                format!("block over {} items exceeds the limit of {}", items.len(), limit),
            ));
        }

        let program = self.state.program.function(function)?.clone();
        let expected = program.callpoint_count();
        if items.is_empty() || expected == 0 {
            let outcomes: Vec<BlockOutcome> = items
                .into_iter()
                .map(|item| BlockOutcome {
                    item,
                    results: vec![],
                })
                .collect();
            return Ok(Resolution::Value(finish(&outcomes)));
        }

        let collector = Arc::new(Collector {
            parent: Arc::downgrade(&self.state),
            reference,
            expected,
            slots: Mutex::new(
                items
                    .iter()
                    .map(|item| Slot {
                        item: item.clone(),
                        results: BTreeMap::new(),
                    })
                    .collect(),
            ),
            finish: Box::new(finish),
        });

        let mut children = Vec::with_capacity(items.len());
        for (slot, item) in items.into_iter().enumerate() {
            let collector = collector.clone();
            children.push(Executor::build(
                self.state.runtime.clone(),
                program.clone(),
                self.state.props.clone(),
                Some(item),
                Box::new(move |_, child_ref, result| collector.record(slot, child_ref, result)),
            )?);
        }

        if let Some((_, previous)) = self.state.blocks.remove(&reference) {
            for child in previous {
                child.unregister();
            }
        }
        self.state.blocks.insert(reference, children.clone());
        debug!(reference, items = children.len(), "exec> run blocks");

        for child in &children {
            child.run();
        }
        Ok(Resolution::Pending)
    }
}
