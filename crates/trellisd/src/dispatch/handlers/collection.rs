//! Keyed records backed by a [`Store`].
//!
//! Reserved suffixes below the collection URL:
//!
//! | path                      | verbs        |
//! |---------------------------|--------------|
//! | (root)                    | GET          |
//! | `id/<key>`                | GET, DELETE  |
//! | `id/<key>/<method>[/wait]`| per method   |
//! | `list`                    | GET, DELETE  |
//! | `new`                     | POST         |
//! | `delete`                  | POST         |

use std::any::TypeId;
use std::sync::Arc;

use trellis_wire::hypermedia::{Dataset, List};
use trellis_wire::{Hyperlink, Method, Selector, Value, selector};

use super::{Bind, Exposed, Handler, MethodTable, expect_instance};
use crate::dispatch::context::{Context, Frame, SubRequest};
use crate::dispatch::errors::{DispatchError, RegistrationError};
use crate::dispatch::interface::Args;
use crate::dispatch::object::{Instance, Object, Reply};
use crate::dispatch::query;
use crate::store::{Schema, Store};

const ID_SEGMENT: &str = "id";
const LIST_SEGMENT: &str = "list";
const NEW_SEGMENT: &str = "new";
const DELETE_SEGMENT: &str = "delete";

const WHERE_PARAM: &str = "where";
const LIMIT_PARAM: &str = "limit";
const CONTINUE_PARAM: &str = "continue";

/// Node exposing the records of a [`Store`].
pub struct CollectionHandler<S: Store> {
    url: String,
    store: S,
    schema: Schema,
    table: MethodTable<S::Record>,
}

impl<S: Store> CollectionHandler<S> {
    fn record_url(&self, key: &str) -> String {
        format!("{}/{ID_SEGMENT}/{}", self.url, query::segment(key))
    }

    fn suffix_url(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.url)
    }

    fn record_link(&self, record: &S::Record) -> Result<Hyperlink, DispatchError> {
        let key = self.store.key_for(record);
        let resource = self
            .table
            .resource(record, self.record_url(&key))?
            .in_collection(self.url.as_str(), key);
        Ok(Hyperlink::Resource(resource))
    }

    /// Parses `where`, rejecting keys the collection does not index.
    fn selector(&self, text: &str) -> Result<Option<Selector>, DispatchError> {
        let parsed = selector::parse(text)?;
        if let Some(unknown) = parsed
            .iter()
            .flat_map(Selector::keys)
            .find(|key| !self.schema.selectors.iter().any(|known| known == key))
        {
            return Err(DispatchError::invalid_argument(format!(
                "'{unknown}' cannot be used in a selector"
            )));
        }
        Ok(parsed)
    }

    fn list(&self, request: &SubRequest, context: &Context<'_>) -> Result<Reply, DispatchError> {
        let selected = match request.param(WHERE_PARAM) {
            Some(text) => self.selector(text)?,
            None => None,
        };
        let limit = request
            .param(LIMIT_PARAM)
            .map(parse_limit)
            .transpose()?;
        let page = self
            .store
            .list(selected.as_ref(), limit, request.param(CONTINUE_PARAM))?;

        let items = page
            .records
            .iter()
            .map(|record| {
                let link = self.record_link(record)?;
                Ok(Value::Tagged(link.to_tagged(context.registry())?))
            })
            .collect::<Result<Vec<_>, DispatchError>>()?;
        Ok(Object::hyperlink(Hyperlink::List(List {
            kind: self.table.interface().kind().to_owned(),
            collection: self.url.clone(),
            items,
            selector: selector::dump(selected.as_ref()),
            continuation: page.next,
        })))
    }

    /// Removes the records matched by a mandatory `where`.
    fn delete_matching(&self, text: Option<&str>) -> Result<Reply, DispatchError> {
        let selector_text = text.ok_or_else(|| {
            DispatchError::invalid_argument("bulk delete needs a 'where' selector; use '*' for all")
        })?;
        let removed = self.store.delete_matching(self.selector(selector_text)?.as_ref())?;
        let count = i64::try_from(removed)
            .map_err(|_| DispatchError::internal("deleted record count overflows"))?;
        Ok(Reply::data(count))
    }

    fn record(&self, request: SubRequest, context: &mut Context<'_>) -> Result<Reply, DispatchError> {
        let (head, rest) = request.descend();
        let Some(key) = head else {
            return Err(DispatchError::not_found(self.suffix_url(ID_SEGMENT)));
        };
        let url = self.record_url(&key);
        if rest.path.is_empty() {
            return match rest.method {
                Method::Get => Ok(record_reply(self.store.lookup(&key)?)),
                Method::Delete => {
                    self.store.delete(&key)?;
                    Ok(Reply::null())
                }
                method => Err(DispatchError::method_not_allowed(method, url)),
            };
        }
        let record = self.store.lookup(&key)?;
        context.enter(Frame::new(url, Vec::new(), Instance::shared(record)));
        self.table.invoke(rest, context)
    }
}

fn record_reply<R: Exposed>(record: Arc<R>) -> Reply {
    Reply::Object(Object::Instance(Instance::shared(record)))
}

fn parse_limit(text: &str) -> Result<usize, DispatchError> {
    match query::decode_value(text) {
        Value::Integer(limit) if limit > 0 => usize::try_from(limit)
            .map_err(|_| DispatchError::invalid_argument(format!("limit {limit} is too large"))),
        _ => Err(DispatchError::invalid_argument(format!(
            "limit must be a positive integer, found '{text}'"
        ))),
    }
}

/// `where` from the query string, else from a mapping body.
fn where_text(request: &SubRequest) -> Option<String> {
    if let Some(text) = request.param(WHERE_PARAM) {
        return Some(text.to_owned());
    }
    match &request.body {
        Some(Value::Map(entries)) => match entries.get(WHERE_PARAM) {
            Some(Value::String(text)) => Some(text.clone()),
            _ => None,
        },
        _ => None,
    }
}

impl<S: Store> Bind<S> for CollectionHandler<S> {
    fn bind(url: String, store: S) -> Result<Self, RegistrationError> {
        let table = MethodTable::declare()?;
        let schema = store.schema();
        schema.create.validate(table.interface().kind())?;
        RegistrationError::check_name(&schema.key)?;
        Ok(Self {
            url,
            store,
            schema,
            table,
        })
    }
}

impl<S: Store> Handler for CollectionHandler<S> {
    fn url(&self) -> &str {
        &self.url
    }

    fn embeds(&self) -> Vec<TypeId> {
        vec![TypeId::of::<S::Record>()]
    }

    fn describe(&self) -> Hyperlink {
        Hyperlink::Dataset(Dataset {
            kind: self.table.interface().kind().to_owned(),
            url: self.url.clone(),
            create: self.schema.create.names(),
            selectors: self.schema.selectors.clone(),
            key: Some(self.schema.key.clone()),
        })
    }

    fn embed(&self, instance: &Instance) -> Result<Hyperlink, DispatchError> {
        self.record_link(expect_instance::<S::Record>(instance)?)
    }

    fn handle(
        &self,
        request: SubRequest,
        context: &mut Context<'_>,
    ) -> Result<Reply, DispatchError> {
        let (head, rest) = request.descend();
        match (head.as_deref(), rest.method) {
            (None, Method::Get) => Ok(Object::hyperlink(self.describe())),
            (None, method) => Err(DispatchError::method_not_allowed(method, self.url.as_str())),
            (Some(ID_SEGMENT), _) => self.record(rest, context),
            (Some(LIST_SEGMENT), _) if !rest.path.is_empty() => {
                Err(DispatchError::not_found(self.suffix_url(LIST_SEGMENT)))
            }
            (Some(LIST_SEGMENT), Method::Get) => self.list(&rest, context),
            (Some(LIST_SEGMENT), Method::Delete) => self.delete_matching(rest.param(WHERE_PARAM)),
            (Some(NEW_SEGMENT), Method::Post) if rest.path.is_empty() => {
                let args = Args::bind(&self.schema.create, rest.body)?;
                Ok(record_reply(self.store.create(args)?))
            }
            (Some(DELETE_SEGMENT), Method::Post) if rest.path.is_empty() => {
                self.delete_matching(where_text(&rest).as_deref())
            }
            (Some(segment @ (LIST_SEGMENT | NEW_SEGMENT | DELETE_SEGMENT)), method) => Err(
                DispatchError::method_not_allowed(method, self.suffix_url(segment)),
            ),
            (Some(segment), _) => Err(DispatchError::not_implemented(self.suffix_url(segment))),
        }
    }
}
