// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Targets and how they are found.
//!
//! A target is a function of a single argument. Targets are grouped into modules, and modules are
//! registered by name in a [`TargetRegistry`]. A module is registered along with an initializer
//! that adds its functions. The initializer runs every time the module is resolved, and may fail;
//! that failure, a missing module or function, or a function that doesn't take exactly one
//! argument, is reported as a [`LoadError`] before any case runs.
//!
//! The same registry is consulted twice for each run: once in the runner process to validate the
//! target, and once in each worker process to actually call it. Both processes run the same
//! program, so they see the same registry.

use crate::errors::{LoadError, ModuleInitError, TargetCallError};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::BTreeMap, fmt, marker::PhantomData, sync::Arc};

/// The number of arguments the harness passes to a target.
pub const SUPPORTED_ARITY: usize = 1;

/// A function under test.
pub trait Target: Send + Sync {
    /// The number of arguments this function declares.
    ///
    /// The harness only ever calls functions that declare exactly one argument.
    fn arity(&self) -> usize {
        SUPPORTED_ARITY
    }

    /// Calls the function with the given input.
    ///
    /// Panics are allowed: they are caught by the worker and reported as crashes.
    fn call(&self, input: Value) -> Result<Value, TargetCallError>;
}

/// Adapts a Rust function of one argument into a [`Target`].
///
/// The input is deserialized into `I` and the return value is serialized from `O`.
pub struct UnaryFn<F, I, O> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<F, I, O> UnaryFn<F, I, O>
where
    F: Fn(I) -> O + Send + Sync,
    I: DeserializeOwned,
    O: Serialize,
{
    /// Creates a new adapter.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, I, O> Target for UnaryFn<F, I, O>
where
    F: Fn(I) -> O + Send + Sync,
    I: DeserializeOwned,
    O: Serialize,
{
    fn call(&self, input: Value) -> Result<Value, TargetCallError> {
        let input: I = serde_json::from_value(input).map_err(TargetCallError::InvalidInput)?;
        let output = (self.f)(input);
        serde_json::to_value(output).map_err(TargetCallError::InvalidOutput)
    }
}

/// The module and function name of a target.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TargetSpec {
    /// The name of the module.
    pub module: String,

    /// The name of the function within the module.
    pub function: String,
}

impl TargetSpec {
    /// Creates a new target spec.
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.function)
    }
}

/// A target that was found and validated.
#[derive(Clone)]
pub struct ResolvedTarget {
    spec: TargetSpec,
    target: Arc<dyn Target>,
}

impl ResolvedTarget {
    /// Returns the module and function name of this target.
    pub fn spec(&self) -> &TargetSpec {
        &self.spec
    }

    /// Calls the target in the current process.
    ///
    /// Panics are not caught. Use the worker to run a target in isolation.
    pub fn call(&self, input: Value) -> Result<Value, TargetCallError> {
        self.target.call(input)
    }
}

impl fmt::Debug for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedTarget")
            .field("spec", &self.spec)
            .field("arity", &self.target.arity())
            .finish_non_exhaustive()
    }
}

/// Finds targets by module and function name.
pub trait TargetResolver {
    /// Resolves and validates a target.
    fn resolve(&self, spec: &TargetSpec) -> Result<ResolvedTarget, LoadError>;
}

type ModuleInit = dyn Fn(&mut ModuleBuilder) -> Result<(), ModuleInitError> + Send + Sync;

/// A set of named modules containing targets.
#[derive(Clone, Default)]
pub struct TargetRegistry {
    modules: BTreeMap<String, Arc<ModuleInit>>,
}

impl TargetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module.
    ///
    /// The initializer adds the module's functions to the builder it is given. It runs every time
    /// the module is resolved. If a module with the same name was already registered, it is
    /// replaced.
    pub fn register_module<F>(&mut self, name: impl Into<String>, init: F) -> &mut Self
    where
        F: Fn(&mut ModuleBuilder) -> Result<(), ModuleInitError> + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Arc::new(init));
        self
    }

    /// Returns the names of the registered modules, in sorted order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.modules.keys().map(|name| name.as_str())
    }

    /// Loads a module, running its initializer.
    pub fn load_module(&self, name: &str) -> Result<Module, LoadError> {
        let init = self
            .modules
            .get(name)
            .ok_or_else(|| LoadError::ModuleNotFound {
                module: name.to_owned(),
            })?;

        let mut builder = ModuleBuilder::default();
        init(&mut builder).map_err(|error| LoadError::ModuleInit {
            module: name.to_owned(),
            reason: error.reason().to_owned(),
        })?;

        Ok(Module {
            name: name.to_owned(),
            functions: builder.functions,
        })
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TargetResolver for TargetRegistry {
    fn resolve(&self, spec: &TargetSpec) -> Result<ResolvedTarget, LoadError> {
        let module = self.load_module(&spec.module)?;
        let target = module
            .functions
            .get(&spec.function)
            .ok_or_else(|| LoadError::FunctionNotFound {
                module: spec.module.clone(),
                function: spec.function.clone(),
            })?;

        let arity = target.arity();
        if arity != SUPPORTED_ARITY {
            return Err(LoadError::ArityMismatch {
                function: spec.function.clone(),
                expected: SUPPORTED_ARITY,
                actual: arity,
            });
        }

        Ok(ResolvedTarget {
            spec: spec.clone(),
            target: target.clone(),
        })
    }
}

/// Collects the functions of a module while its initializer runs.
#[derive(Default)]
pub struct ModuleBuilder {
    functions: BTreeMap<String, Arc<dyn Target>>,
}

impl ModuleBuilder {
    /// Adds a Rust function of one argument.
    pub fn function<F, I, O>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
        I: DeserializeOwned + 'static,
        O: Serialize + 'static,
    {
        self.target(name, UnaryFn::new(f))
    }

    /// Adds an arbitrary target.
    pub fn target(&mut self, name: impl Into<String>, target: impl Target + 'static) -> &mut Self {
        self.functions.insert(name.into(), Arc::new(target));
        self
    }
}

/// A loaded module.
pub struct Module {
    name: String,
    functions: BTreeMap<String, Arc<dyn Target>>,
}

impl Module {
    /// Returns the name of this module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterates over the functions of this module as (name, arity) pairs, in sorted order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.functions
            .iter()
            .map(|(name, target)| (name.as_str(), target.arity()))
    }
}
