//! Call arguments and their binding against declared parameter names.

use std::collections::BTreeMap;

use trellis_wire::Value;

use crate::errors::ClientError;

/// Positional and named arguments for a remote call.
///
/// ```
/// use trellis_client::CallArgs;
///
/// let args = CallArgs::new().arg(2).named("b", 3);
/// let bound = args
///     .bind(&["a".to_owned(), "b".to_owned()], &Default::default())
///     .expect("binds");
/// assert_eq!(bound.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl CallArgs {
    /// No arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Returns `true` when no argument was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Binds the arguments to `names` in order, then fills absent names from
    /// `defaults`. Names still missing are left for the server to reject.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] for surplus positionals and
    /// for names supplied both positionally and by name.
    pub fn bind(
        &self,
        names: &[String],
        defaults: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, ClientError> {
        if self.positional.len() > names.len() {
            return Err(ClientError::invalid_argument(format!(
                "expected at most {} positional arguments, got {}",
                names.len(),
                self.positional.len()
            )));
        }
        let mut bound = self.named.clone();
        for (name, value) in names.iter().zip(&self.positional) {
            if bound.insert(name.clone(), value.clone()).is_some() {
                return Err(ClientError::invalid_argument(format!(
                    "'{name}' given both by position and by name"
                )));
            }
        }
        for (name, value) in defaults {
            bound.entry(name.clone()).or_insert_with(|| value.clone());
        }
        Ok(bound)
    }
}

impl From<BTreeMap<String, Value>> for CallArgs {
    fn from(named: BTreeMap<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            named,
        }
    }
}
