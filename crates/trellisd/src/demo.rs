//! Demonstration namespace served by the `trellisd` binary.
//!
//! One object of every handler shape, small enough to drive by hand:
//!
//! | name        | shape      | notes                                     |
//! |-------------|------------|-------------------------------------------|
//! | `echo`      | function   | returns its `value` argument              |
//! | `test`      | function   | returns the `echo` form                   |
//! | `math`      | service    | `add(a, b)`, `zero()`                     |
//! | `counter`   | token      | `count` lives in the query string         |
//! | `total`     | singleton  | running sum with `add`, `total`, `reset`  |
//! | `jobs`      | collection | `{name, job}` records keyed by `name`     |
//! | `countdown` | function   | waits `count` polls before answering      |

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Mutex;

use trellis_config::Config;
use trellis_wire::{Registry, Value};

use crate::dispatch::{
    Args, CollectionHandler, Context, DispatchError, Exposed, Function, FunctionHandler,
    Interface, Namespace, Object, Params, Pending, RegistrationError, Reply, ServiceHandler,
    Signature, SingletonHandler, Token, TokenHandler,
};
use crate::store::{MemoryStore, Record, Schema};

fn unknown(kind: &str, method: &str) -> DispatchError {
    DispatchError::not_found(format!("{kind}.{method}"))
}

/// Returns its argument unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Function for Echo {
    fn signature(&self) -> Signature {
        Signature::new(Params::new().required("value"))
    }

    fn invoke(&self, mut args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        Ok(Reply::Data(args.take::<Value>("value")?))
    }
}

/// Returns the [`Echo`] function, which embeds as its form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Test;

impl Function for Test {
    fn signature(&self) -> Signature {
        Signature::safe()
    }

    fn invoke(&self, _args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        Ok(Object::instance(Echo))
    }
}

/// Stateless arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathService;

impl Exposed for MathService {
    fn interface() -> Interface {
        Interface::new("MathService")
            .method("add", Signature::new(Params::new().required("a").optional("b", 0)))
            .method("zero", Signature::safe())
    }

    fn call(&self, method: &str, mut args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        match method {
            "add" => {
                let a: i64 = args.take("a")?;
                let b: i64 = args.take("b")?;
                a.checked_add(b)
                    .map(Reply::data)
                    .ok_or_else(|| DispatchError::invalid_argument("sum overflows"))
            }
            "zero" => Ok(Reply::data(0)),
            other => Err(unknown("MathService", other)),
        }
    }
}

/// A counter whose value travels in its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    count: i64,
}

impl Counter {
    /// Current count.
    #[must_use]
    pub const fn count(&self) -> i64 {
        self.count
    }
}

impl Exposed for Counter {
    fn interface() -> Interface {
        Interface::new("Counter")
            .method("value", Signature::safe())
            .method("increment", Signature::new(Params::new().optional("by", 1)))
    }

    fn attributes(&self) -> Result<BTreeMap<String, Value>, DispatchError> {
        Ok(self.state())
    }

    fn call(&self, method: &str, mut args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        match method {
            "value" => Ok(Reply::data(self.count)),
            "increment" => {
                let by: i64 = args.take("by")?;
                let count = self
                    .count
                    .checked_add(by)
                    .ok_or_else(|| DispatchError::invalid_argument("count overflows"))?;
                Ok(Object::instance(Self { count }))
            }
            other => Err(unknown("Counter", other)),
        }
    }
}

impl Token for Counter {
    fn params() -> Params {
        Params::new().optional("count", 0)
    }

    fn build(mut args: Args) -> Result<Self, DispatchError> {
        Ok(Self {
            count: args.take("count")?,
        })
    }

    fn state(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([("count".to_owned(), Value::from(self.count))])
    }
}

#[derive(Debug, Default)]
struct Sum {
    total: i64,
    additions: i64,
}

/// A running sum shared by every client.
#[derive(Debug, Default)]
pub struct Total {
    sum: Mutex<Sum>,
}

impl Total {
    fn with_sum<T>(&self, update: impl FnOnce(&mut Sum) -> T) -> Result<T, DispatchError> {
        let mut sum = self
            .sum
            .lock()
            .map_err(|_| DispatchError::internal("total lock poisoned"))?;
        Ok(update(&mut sum))
    }
}

impl Exposed for Total {
    fn interface() -> Interface {
        Interface::new("Total")
            .method("add", Signature::new(Params::new().required("amount")))
            .method("total", Signature::safe())
            .method("reset", Signature::new(Params::new()))
    }

    fn attributes(&self) -> Result<BTreeMap<String, Value>, DispatchError> {
        self.with_sum(|sum| {
            BTreeMap::from([
                ("additions".to_owned(), Value::from(sum.additions)),
                ("_total".to_owned(), Value::from(sum.total)),
            ])
        })
    }

    fn call(&self, method: &str, mut args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        match method {
            "add" => {
                let amount: i64 = args.take("amount")?;
                self.with_sum(|sum| {
                    sum.total = sum.total.saturating_add(amount);
                    sum.additions = sum.additions.saturating_add(1);
                })?;
                Ok(Reply::null())
            }
            "total" => self.with_sum(|sum| Reply::data(sum.total)),
            "reset" => self.with_sum(|sum| {
                *sum = Sum::default();
                Reply::null()
            }),
            other => Err(unknown("Total", other)),
        }
    }
}

/// A named unit of work.
#[derive(Debug)]
pub struct Job {
    name: String,
    job: Mutex<String>,
}

impl Job {
    /// Creates a job record.
    #[must_use]
    pub fn new(name: &str, job: &str) -> Self {
        Self {
            name: name.to_owned(),
            job: Mutex::new(job.to_owned()),
        }
    }

    fn job(&self) -> Result<String, DispatchError> {
        self.job
            .lock()
            .map(|job| job.clone())
            .map_err(|_| DispatchError::internal("job lock poisoned"))
    }
}

impl Exposed for Job {
    fn interface() -> Interface {
        Interface::new("Job")
            .method("describe", Signature::safe())
            .method("assign", Signature::new(Params::new().required("job")))
    }

    fn attributes(&self) -> Result<BTreeMap<String, Value>, DispatchError> {
        Ok(BTreeMap::from([
            ("name".to_owned(), Value::from(self.name.as_str())),
            ("job".to_owned(), Value::from(self.job()?)),
        ]))
    }

    fn call(&self, method: &str, mut args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        match method {
            "describe" => Ok(Reply::data(format!("{} works on {}", self.name, self.job()?))),
            "assign" => {
                let next: String = args.take("job")?;
                let mut job = self
                    .job
                    .lock()
                    .map_err(|_| DispatchError::internal("job lock poisoned"))?;
                *job = next;
                Ok(Reply::null())
            }
            other => Err(unknown("Job", other)),
        }
    }
}

impl Record for Job {
    fn schema() -> Schema {
        Schema {
            create: Params::new().required("name").optional("job", "idle"),
            selectors: vec!["name".to_owned(), "job".to_owned()],
            key: "name".to_owned(),
        }
    }

    fn key(&self) -> String {
        self.name.clone()
    }

    fn create(mut args: Args) -> Result<Self, DispatchError> {
        let name: String = args.take("name")?;
        let job: String = args.take("job")?;
        Ok(Self::new(&name, &job))
    }
}

/// Answers after `count` polls of its waiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Countdown;

const COUNTDOWN_DONE: &str = "done";

fn countdown_step(remaining: i64) -> Reply {
    if remaining <= 0 {
        Reply::data(COUNTDOWN_DONE)
    } else {
        Object::pending(Pending::new().with("remaining", remaining))
    }
}

impl Function for Countdown {
    fn signature(&self) -> Signature {
        Signature::new(Params::new().required("count")).waiting()
    }

    fn invoke(&self, mut args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        Ok(countdown_step(args.take("count")?))
    }

    fn resume(&self, mut state: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        let remaining: i64 = state.take("remaining")?;
        Ok(countdown_step(remaining.saturating_sub(1)))
    }
}

/// Builds the demonstration namespace under the configured URL prefix.
///
/// # Errors
///
/// Returns a [`RegistrationError`] when a declaration is invalid.
pub fn namespace(config: &Config) -> Result<Namespace, RegistrationError> {
    let mut namespace = Namespace::new(&config.url_prefix(), Registry::hypermedia());
    namespace
        .register::<FunctionHandler<Echo>, _>("echo", Echo)?
        .register::<FunctionHandler<Test>, _>("test", Test)?
        .register::<ServiceHandler<MathService>, _>("math", MathService)?
        .register::<TokenHandler<Counter>, _>("counter", PhantomData)?
        .register::<SingletonHandler<Total>, _>("total", Total::default())?
        .register::<CollectionHandler<MemoryStore<Job>>, _>("jobs", MemoryStore::new())?
        .register::<FunctionHandler<Countdown>, _>("countdown", Countdown)?;
    Ok(namespace)
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use trellis_wire::selector;

    use super::*;
    use crate::store::{Store, StoreError};

    fn poison<T>(lock: &Mutex<T>) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.lock();
            panic!("writer died");
        }));
        assert!(outcome.is_err());
        assert!(lock.is_poisoned());
    }

    #[test]
    fn a_poisoned_total_reports_no_attributes() {
        let total = Total::default();
        poison(&total.sum);
        let error = total.attributes().expect_err("poisoned");
        assert!(matches!(error, DispatchError::Internal { .. }), "{error:?}");
    }

    #[test]
    fn a_poisoned_job_reports_an_error() {
        let job = Job::new("ada", "foo");
        poison(&job.job);
        assert!(job.attributes().is_err());
    }

    #[test]
    fn selectors_over_unreadable_records_fail_the_listing() {
        let store = MemoryStore::new();
        let job = store.insert(Job::new("ada", "foo")).expect("insert");
        store.insert(Job::new("bob", "bar")).expect("insert");
        poison(&job.job);

        let filter = selector::parse("job==foo").expect("selector");
        let error = store.list(filter.as_ref(), None, None).expect_err("unreadable");
        assert!(matches!(error, StoreError::Unreadable { ref key, .. } if key == "ada"), "{error:?}");
        assert!(matches!(
            store.delete_matching(filter.as_ref()),
            Err(StoreError::Unreadable { .. })
        ));
        assert_eq!(store.len().expect("len"), 2);
    }

    #[test]
    fn healthy_jobs_expose_both_attributes() {
        let attributes = Job::new("ada", "foo").attributes().expect("attributes");
        assert_eq!(attributes.get("job"), Some(&Value::from("foo")));
        assert_eq!(attributes.get("name"), Some(&Value::from("ada")));
    }
}
