//! Snippet execution.
//!
//! # Responsibilities
//! - Parse and run a snippet as a fresh Starlark module
//! - Look up and call its zero-argument `filter` function
//! - Extract the ordered proxy names from the returned sequence
//! - Bound every evaluation by a wall-clock budget and a cancellation flag
//!
//! # Design Decisions
//! - Evaluation happens on a dedicated thread. A statement hook checks the
//!   deadline and the cancellation flag before every statement and aborts
//!   the run, so the thread exits shortly after its budget
//! - A single statement that never yields (a huge comprehension) cannot be
//!   interrupted; the caller stops waiting after a short grace period
//! - Result elements that are neither names nor proxy dicts are dropped,
//!   not reported

use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use starlark::codemap::FileSpanRef;
use starlark::environment::{Globals, Module};
use starlark::eval::{BeforeStmtFuncDyn, Evaluator};
use starlark::syntax::{AstModule, Dialect};
use starlark::values::dict::DictRef;
use starlark::values::list::ListRef;
use starlark::values::tuple::TupleRef;
use starlark::values::Value;
use thiserror::Error;

use crate::config::ScriptConfig;
use crate::script::binding::ProxyBinding;
use crate::script::cancel::Cancellation;

/// Name of the function every snippet must define.
pub const FILTER_SYMBOL: &str = "filter";

/// Name under which the baseline proxies are visible to snippets.
pub const PROXIES_BINDING: &str = "proxies";

const SNIPPET_FILENAME: &str = "snippet.star";

/// How long past the budget the caller waits for the thread to notice.
const ABANDON_GRACE: Duration = Duration::from_millis(250);

/// Reasons a snippet failed to produce a member list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Source did not parse.
    #[error("snippet does not parse: {0}")]
    Parse(String),

    /// Top-level statements of the snippet failed.
    #[error("snippet failed to load: {0}")]
    Load(String),

    /// No `filter` symbol after running the module.
    #[error("function 'filter' not defined in snippet")]
    MissingFilter,

    /// `filter()` raised.
    #[error("'filter' raised: {0}")]
    Runtime(String),

    /// `filter()` returned something other than a list or tuple.
    #[error("'filter' returned {0}, expected a list")]
    NotASequence(String),

    /// Snippet source exceeds the configured limit.
    #[error("snippet is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    /// Evaluation did not finish within its budget.
    #[error("snippet exceeded its {0:?} budget")]
    Timeout(Duration),

    /// The request that asked for the evaluation went away.
    #[error("snippet evaluation cancelled")]
    Cancelled,

    /// The evaluation thread could not be started or died.
    #[error("snippet evaluation aborted: {0}")]
    Aborted(String),
}

/// Runs snippets against a [`ProxyBinding`].
#[derive(Debug, Clone)]
pub struct ScriptEvaluator {
    budget: Duration,
    max_source_bytes: usize,
}

impl Default for ScriptEvaluator {
    fn default() -> Self {
        Self::from_config(&ScriptConfig::default())
    }
}

type Evaluation = Result<Vec<String>, ScriptError>;

impl ScriptEvaluator {
    pub fn new(budget: Duration, max_source_bytes: usize) -> Self {
        Self {
            budget,
            max_source_bytes,
        }
    }

    pub fn from_config(config: &ScriptConfig) -> Self {
        Self::new(Duration::from_millis(config.timeout_ms), config.max_source_bytes)
    }

    /// Evaluate `source` and return the proxy names its `filter` selects.
    pub fn evaluate(&self, source: &str, binding: &ProxyBinding) -> Evaluation {
        self.evaluate_with(source, binding, &Cancellation::new())
    }

    /// Like [`evaluate`](Self::evaluate), stopping early once `cancel` fires.
    pub fn evaluate_with(&self, source: &str, binding: &ProxyBinding, cancel: &Cancellation) -> Evaluation {
        let (rx, _thread) = self.spawn(source, binding, cancel)?;

        match rx.recv_timeout(self.budget + ABANDON_GRACE) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(budget = ?self.budget, "Abandoning unresponsive snippet evaluation");
                Err(ScriptError::Timeout(self.budget))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(ScriptError::Aborted("evaluation thread panicked".into()))
            }
        }
    }

    fn spawn(
        &self,
        source: &str,
        binding: &ProxyBinding,
        cancel: &Cancellation,
    ) -> Result<(Receiver<Evaluation>, JoinHandle<()>), ScriptError> {
        if source.len() > self.max_source_bytes {
            return Err(ScriptError::TooLarge {
                size: source.len(),
                limit: self.max_source_bytes,
            });
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let guard = StatementGuard {
            budget: self.budget,
            deadline: Instant::now() + self.budget,
            cancel: cancel.clone(),
        };
        let owned_source = source.to_owned();
        let binding = binding.clone();
        let handle = thread::Builder::new()
            .name("snippet-eval".into())
            .spawn(move || {
                // Receiver is gone once the caller stopped waiting.
                let _ = tx.send(run_filter(owned_source, &binding, guard));
            })
            .map_err(|e| ScriptError::Aborted(e.to_string()))?;
        Ok((rx, handle))
    }
}

/// Limits checked before every statement of a run.
#[derive(Debug, Clone)]
struct StatementGuard {
    budget: Duration,
    deadline: Instant,
    cancel: Cancellation,
}

impl StatementGuard {
    fn check(&self) -> Result<(), ScriptError> {
        if self.cancel.is_cancelled() {
            Err(ScriptError::Cancelled)
        } else if Instant::now() >= self.deadline {
            Err(ScriptError::Timeout(self.budget))
        } else {
            Ok(())
        }
    }
}

/// Statement hook; records why it stopped the run.
struct StatementHook {
    guard: StatementGuard,
    stopped: Rc<Cell<bool>>,
}

impl<'a, 'e: 'a> BeforeStmtFuncDyn<'a, 'e> for StatementHook {
    fn call<'v>(&mut self, _span: FileSpanRef, _eval: &mut Evaluator<'v, 'a, 'e>) -> starlark::Result<()> {
        self.guard.check().map_err(|e| {
            self.stopped.set(true);
            starlark::Error::new_other(e)
        })
    }
}

fn run_filter(source: String, binding: &ProxyBinding, guard: StatementGuard) -> Evaluation {
    let ast = AstModule::parse(SNIPPET_FILENAME, source, &Dialect::Standard)
        .map_err(|e| ScriptError::Parse(e.to_string()))?;

    let globals = Globals::standard();
    let module = Module::new();
    module.set(PROXIES_BINDING, binding.alloc(module.heap()));

    let stopped = Rc::new(Cell::new(false));
    let hook: Box<dyn BeforeStmtFuncDyn<'_, '_>> = Box::new(StatementHook {
        guard: guard.clone(),
        stopped: stopped.clone(),
    });
    let mut eval = Evaluator::new(&module);
    // Installed before compilation so every statement is instrumented.
    eval.before_stmt_for_dap(hook.into());

    let interrupted = |fallback: ScriptError| match guard.check() {
        Err(limit) if stopped.get() => limit,
        _ => fallback,
    };

    eval.eval_module(ast, &globals)
        .map_err(|e| interrupted(ScriptError::Load(e.to_string())))?;

    let filter = module.get(FILTER_SYMBOL).ok_or(ScriptError::MissingFilter)?;
    let result = eval
        .eval_function(filter, &[], &[])
        .map_err(|e| interrupted(ScriptError::Runtime(e.to_string())))?;

    let items = if let Some(list) = ListRef::from_value(result) {
        list.content()
    } else if let Some(tuple) = TupleRef::from_value(result) {
        tuple.content()
    } else {
        return Err(ScriptError::NotASequence(result.get_type().to_owned()));
    };

    Ok(items.iter().filter_map(|item| member_name(*item)).collect())
}

/// A selected member: a name string, or a proxy dict carrying one.
fn member_name(item: Value<'_>) -> Option<String> {
    if let Some(name) = item.unpack_str() {
        return Some(name.to_owned());
    }
    let dict = DictRef::from_value(item)?;
    let name = dict.get_str("name")?;
    name.unpack_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Proxy;

    fn binding() -> ProxyBinding {
        let mut hk: Proxy = Proxy::new("hk1");
        hk.extra.insert("type".into(), "ss".into());
        ProxyBinding::new(&[Proxy::new("us1"), Proxy::new("us2"), hk])
    }

    fn evaluator() -> ScriptEvaluator {
        ScriptEvaluator::new(Duration::from_secs(5), 64 * 1024)
    }

    #[test]
    fn test_filter_selects_names_in_order() {
        let names = evaluator()
            .evaluate(
                "def filter():\n    return [p['name'] for p in proxies if p['name'].startswith('us')]\n",
                &binding(),
            )
            .unwrap();
        assert_eq!(names, vec!["us1", "us2"]);
    }

    #[test]
    fn test_filter_sees_extra_fields() {
        let names = evaluator()
            .evaluate(
                "def filter():\n    return [p['name'] for p in proxies if p.get('type') == 'ss']\n",
                &binding(),
            )
            .unwrap();
        assert_eq!(names, vec!["hk1"]);
    }

    #[test]
    fn test_non_string_elements_are_dropped() {
        let names = evaluator()
            .evaluate("def filter():\n    return ['a', 1, None, 'b', {'type': 'ss'}]\n", &binding())
            .unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_proxy_dicts_yield_their_names() {
        let names = evaluator()
            .evaluate("def filter(): return [p for p in proxies if p['name']=='us2']", &binding())
            .unwrap();
        assert_eq!(names, vec!["us2"]);
    }

    #[test]
    fn test_tuple_result_accepted() {
        let names = evaluator()
            .evaluate("def filter():\n    return ('x', 'y')\n", &binding())
            .unwrap();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_parse_error() {
        let err = evaluator().evaluate("def filter(:\n", &binding()).unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
    }

    #[test]
    fn test_load_error_for_undefined_name() {
        // A literal proxy name read as a snippet.
        let err = evaluator().evaluate("us1", &binding()).unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_) | ScriptError::Load(_)));
    }

    #[test]
    fn test_missing_filter() {
        let err = evaluator().evaluate("x = 1\n", &binding()).unwrap_err();
        assert_eq!(err, ScriptError::MissingFilter);
    }

    #[test]
    fn test_runtime_fault() {
        let err = evaluator()
            .evaluate("def filter():\n    return proxies[99]['name']\n", &binding())
            .unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
    }

    #[test]
    fn test_non_sequence_result() {
        let err = evaluator()
            .evaluate("def filter():\n    return 'us1'\n", &binding())
            .unwrap_err();
        assert!(matches!(err, ScriptError::NotASequence(ref t) if t == "string"));
    }

    #[test]
    fn test_snippet_cannot_mutate_binding_for_others() {
        let binding = binding();
        let evaluator = evaluator();
        evaluator
            .evaluate("def filter():\n    proxies.clear()\n    return []\n", &binding)
            .unwrap();
        let names = evaluator
            .evaluate("def filter():\n    return [p['name'] for p in proxies]\n", &binding)
            .unwrap();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_source_size_limit() {
        let evaluator = ScriptEvaluator::new(Duration::from_secs(1), 8);
        let err = evaluator
            .evaluate("def filter():\n    return []\n", &binding())
            .unwrap_err();
        assert!(matches!(err, ScriptError::TooLarge { limit: 8, .. }));
    }

    #[test]
    fn test_budget_exceeded() {
        let evaluator = ScriptEvaluator::new(Duration::from_millis(50), 64 * 1024);
        let source = "def filter():\n    n = 0\n    for i in range(1000000000):\n        n += i\n    return []\n";
        let err = evaluator.evaluate(source, &binding()).unwrap_err();
        assert_eq!(err, ScriptError::Timeout(Duration::from_millis(50)));
    }

    const NESTED_LOOP: &str = "def filter():\n    for i in range(1000000):\n        for j in range(1000000):\n            pass\n    return []\n";

    fn wait_finished(handle: &JoinHandle<()>, within: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < within {
            if handle.is_finished() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        handle.is_finished()
    }

    #[test]
    fn test_timed_out_thread_exits() {
        let evaluator = ScriptEvaluator::new(Duration::from_millis(50), 64 * 1024);
        let (rx, handle) = evaluator
            .spawn(NESTED_LOOP, &binding(), &Cancellation::new())
            .unwrap();

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, Err(ScriptError::Timeout(Duration::from_millis(50))));
        assert!(wait_finished(&handle, Duration::from_secs(2)));
    }

    #[test]
    fn test_timeout_in_module_body() {
        let evaluator = ScriptEvaluator::new(Duration::from_millis(50), 64 * 1024);
        let source = "for i in range(1000000000):\n    pass\ndef filter():\n    return []\n";
        let err = evaluator.evaluate(source, &binding()).unwrap_err();
        assert_eq!(err, ScriptError::Timeout(Duration::from_millis(50)));
    }

    #[test]
    fn test_cancel_stops_running_snippet() {
        let evaluator = ScriptEvaluator::new(Duration::from_secs(30), 64 * 1024);
        let cancel = Cancellation::new();
        let (rx, handle) = evaluator.spawn(NESTED_LOOP, &binding(), &cancel).unwrap();

        thread::sleep(Duration::from_millis(50));
        cancel.cancel();

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, Err(ScriptError::Cancelled));
        assert!(wait_finished(&handle, Duration::from_secs(2)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let err = evaluator()
            .evaluate_with("def filter():\n    return ['us1']\n", &binding(), &cancel)
            .unwrap_err();
        assert_eq!(err, ScriptError::Cancelled);
    }
}
