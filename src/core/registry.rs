// In-memory registry of live stacks keyed by generated ids.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::op::{Operator, unknown_operator};
use crate::core::random::{RandomDigits, ValueSource, generate_key};
use crate::core::stack::Stack;

type SharedStack = Arc<Mutex<Stack>>;

pub struct StackRegistry {
    stacks: RwLock<HashMap<String, SharedStack>>,
    values: Box<dyn ValueSource>,
}

impl Default for StackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StackRegistry {
    pub fn new() -> Self {
        Self::with_value_source(RandomDigits)
    }

    pub fn with_value_source(values: impl ValueSource + 'static) -> Self {
        Self {
            stacks: RwLock::new(HashMap::new()),
            values: Box::new(values),
        }
    }

    /// Inserts an empty stack under a fresh key.
    pub fn create(&self) -> Result<String, Error> {
        let mut stacks = self.stacks.write().unwrap_or_else(|poison| poison.into_inner());
        let key = loop {
            let key = generate_key();
            if !stacks.contains_key(&key) {
                break key;
            }
        };
        stacks.insert(key.clone(), Arc::new(Mutex::new(Stack::new())));
        debug!(stack = %key, "stack created");
        Ok(key)
    }

    /// Live keys, sorted.
    pub fn list(&self) -> Vec<String> {
        let stacks = self.stacks.read().unwrap_or_else(|poison| poison.into_inner());
        let mut keys: Vec<String> = stacks.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.stacks
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Result<Vec<i64>, Error> {
        let stack = self.lookup(key)?;
        let snapshot = lock(&stack).snapshot();
        Ok(snapshot)
    }

    pub fn delete(&self, key: &str) -> Result<(), Error> {
        let mut stacks = self.stacks.write().unwrap_or_else(|poison| poison.into_inner());
        match stacks.remove(key) {
            Some(_) => {
                debug!(stack = %key, "stack deleted");
                Ok(())
            }
            None => Err(not_found(key)),
        }
    }

    /// Pushes the next value from the registry's value source.
    pub fn push(&self, key: &str) -> Result<Vec<i64>, Error> {
        let stack = self.lookup(key)?;
        let value = self.values.next_value()?;
        let mut stack = lock(&stack);
        stack.push(value);
        debug!(stack = %key, value, depth = stack.len(), "value pushed");
        Ok(stack.snapshot())
    }

    pub fn push_value(&self, key: &str, value: i64) -> Result<Vec<i64>, Error> {
        let stack = self.lookup(key)?;
        let mut stack = lock(&stack);
        stack.push(value);
        Ok(stack.snapshot())
    }

    pub fn clear(&self, key: &str) -> Result<Vec<i64>, Error> {
        let stack = self.lookup(key)?;
        let mut stack = lock(&stack);
        stack.clear();
        debug!(stack = %key, "stack cleared");
        Ok(stack.snapshot())
    }

    /// Applies `symbol` to the two topmost values of the stack.
    ///
    /// Checks run in order: unknown key, unknown operator, fewer than two
    /// operands. Evaluation failures leave both operands discarded.
    pub fn apply(&self, key: &str, symbol: &str) -> Result<Vec<i64>, Error> {
        let stack = self.lookup(key)?;
        let op = Operator::from_symbol(symbol)
            .ok_or_else(|| unknown_operator(symbol).with_stack(key))?;

        let mut stack = lock(&stack);
        match stack.apply(op) {
            Ok(result) => {
                debug!(stack = %key, op = %op, result, "operator applied");
                Ok(stack.snapshot())
            }
            Err(err) => {
                if err.kind() != ErrorKind::InsufficientOperands {
                    warn!(stack = %key, op = %op, error = %err, "operands discarded");
                }
                Err(err.with_stack(key))
            }
        }
    }

    fn lookup(&self, key: &str) -> Result<SharedStack, Error> {
        let stacks = self.stacks.read().unwrap_or_else(|poison| poison.into_inner());
        stacks.get(key).cloned().ok_or_else(|| not_found(key))
    }
}

fn lock(stack: &SharedStack) -> MutexGuard<'_, Stack> {
    stack.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn not_found(key: &str) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("stack not found")
        .with_hint("List live stacks with GET /stack or create one with POST /stack.")
        .with_stack(key)
}
