//! The host boundary: loader options, document loading, and the forcing
//! tuple handle returned to callers.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::construct;
use crate::error::{Error, Result, SourceSpan};
use crate::eval::{self, EvalContext, TupleSlotInfo};
use crate::explain;
use crate::preprocess;
use crate::tuple::Tuple;
use crate::value::Value;
use crate::yaml;

/// A host-supplied function. Receives already-forced positional arguments.
pub type HostFn = Rc<dyn Fn(&[Value]) -> std::result::Result<Value, String>>;

/// Maps an import path to the file to read.
pub type ImportResolver = Box<dyn Fn(&str) -> std::result::Result<PathBuf, String>>;

/// How values render inside format strings and `str()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringifyStyle {
    /// Top-level strings render bare.
    #[default]
    Terse,
    /// Strings are quoted everywhere.
    Diagnostic,
}

pub struct LoaderOptions {
    pub functions: FxHashMap<String, HostFn>,
    pub globals: FxHashMap<String, Value>,
    pub import_resolver: Option<ImportResolver>,
    pub max_depth: usize,
    pub stringify: StringifyStyle,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            functions: FxHashMap::default(),
            globals: FxHashMap::default(),
            import_resolver: None,
            max_depth: 512,
            stringify: StringifyStyle::default(),
        }
    }
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(
        mut self,
        name: impl Into<String>,
        function: impl Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Rc::new(function));
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    pub fn with_import_resolver(
        mut self,
        resolver: impl Fn(&str) -> std::result::Result<PathBuf, String> + 'static,
    ) -> Self {
        self.import_resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_stringify(mut self, style: StringifyStyle) -> Self {
        self.stringify = style;
        self
    }
}

/// Shared loader state: options plus the per-path import cache. Configured
/// at construction, immutable afterwards (the cache fills behind a
/// `RefCell`).
pub struct LoaderEnv {
    pub(crate) options: LoaderOptions,
    modules: RefCell<FxHashMap<PathBuf, ModuleSlot>>,
}

enum ModuleSlot {
    Loading,
    Loaded(Rc<Tuple>),
}

/// Loads Yamlet documents and owns the import cache. Each file is parsed
/// at most once per loader instance.
pub struct Loader {
    env: Rc<LoaderEnv>,
}

impl Loader {
    pub fn new(options: LoaderOptions) -> Loader {
        Loader {
            env: Rc::new(LoaderEnv {
                options,
                modules: RefCell::new(FxHashMap::default()),
            }),
        }
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ConfigTuple> {
        let path = path.as_ref();
        let origin = SourceSpan::new(path.to_string_lossy().into_owned(), 1, 1);
        let text = fs::read_to_string(path)
            .map_err(|err| Error::import(path.to_string_lossy(), err.to_string(), origin))?;
        self.load_str(&text, &path.to_string_lossy())
    }

    /// Parse a document from text; `logical_path` names it in spans and
    /// anchors relative imports.
    pub fn load_str(&self, text: &str, logical_path: &str) -> Result<ConfigTuple> {
        let root = parse_source(text, logical_path)?;
        Ok(ConfigTuple {
            tuple: root,
            env: self.env.clone(),
        })
    }
}

fn parse_source(text: &str, file: &str) -> Result<Rc<Tuple>> {
    let text = preprocess::rewrite_else_tags(text);
    let node = yaml::parse_document(&text, file)?;
    construct::construct_root(&node)
}

/// Resolve and load an imported module, caching per canonical path. Called
/// when an `!import` thunk is forced.
pub(crate) fn load_import(
    env: &LoaderEnv,
    path_text: &str,
    origin: &SourceSpan,
) -> Result<Rc<Tuple>> {
    let path = match &env.options.import_resolver {
        Some(resolver) => resolver(path_text)
            .map_err(|cause| Error::import(path_text, cause, origin.clone()))?,
        None => {
            let base = Path::new(origin.file.as_ref())
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            base.join(path_text)
        }
    };
    let canonical = fs::canonicalize(&path)
        .map_err(|err| Error::import(path_text, err.to_string(), origin.clone()))?;
    match env.modules.borrow().get(&canonical) {
        Some(ModuleSlot::Loaded(module)) => return Ok(module.clone()),
        Some(ModuleSlot::Loading) => {
            return Err(Error::import(
                path_text,
                "import re-entered while still loading",
                origin.clone(),
            ));
        }
        None => {}
    }
    env.modules
        .borrow_mut()
        .insert(canonical.clone(), ModuleSlot::Loading);
    let result = fs::read_to_string(&canonical)
        .map_err(|err| Error::import(path_text, err.to_string(), origin.clone()))
        .and_then(|text| parse_source(&text, &canonical.to_string_lossy()));
    match result {
        Ok(module) => {
            env.modules
                .borrow_mut()
                .insert(canonical, ModuleSlot::Loaded(module.clone()));
            Ok(module)
        }
        Err(err) => {
            env.modules.borrow_mut().remove(&canonical);
            Err(err)
        }
    }
}

/// A loaded configuration tuple. Values force on access; results are
/// memoized in the underlying cells.
pub struct ConfigTuple {
    tuple: Rc<Tuple>,
    env: Rc<LoaderEnv>,
}

impl ConfigTuple {
    /// Force and return the value at `key`.
    pub fn get(&self, key: &str) -> Result<Value> {
        let mut ctx = EvalContext::new(&self.env);
        eval::tuple_get(&self.tuple, key, &mut ctx)?
            .ok_or_else(|| Error::key_not_found(key, self.tuple.origin().clone()))
    }

    /// Whether `key` exists, without forcing its value.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let mut ctx = EvalContext::new(&self.env);
        let viewed = crate::compose::view(&self.tuple, &mut ctx)?;
        Ok(viewed.has_key(key))
    }

    /// The value at `key` as a nested configuration tuple.
    pub fn tuple(&self, key: &str) -> Result<ConfigTuple> {
        match self.get(key)? {
            Value::Tuple(tuple) => Ok(ConfigTuple {
                tuple,
                env: self.env.clone(),
            }),
            v => Err(Error::type_mismatch(
                "tuple",
                v.type_name(),
                self.tuple.origin().clone(),
            )),
        }
    }

    /// Keys in definition order. Applies conditional directives but does
    /// not force values.
    pub fn keys(&self) -> Result<Vec<Rc<str>>> {
        let mut ctx = EvalContext::new(&self.env);
        let viewed = crate::compose::view(&self.tuple, &mut ctx)?;
        Ok(viewed.keys())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.keys()?.is_empty())
    }

    /// Force every key and return `(key, value)` pairs in order.
    pub fn items(&self) -> Result<Vec<(Rc<str>, Value)>> {
        let mut ctx = EvalContext::new(&self.env);
        let viewed = crate::compose::view(&self.tuple, &mut ctx)?;
        let mut items = Vec::new();
        for key in viewed.keys() {
            if let Some(value) = eval::force_entry(&viewed, &key, &mut ctx)? {
                items.push((key, value));
            }
        }
        Ok(items)
    }

    /// Force every key, recursively through nested tuples, and return the
    /// fully evaluated tree.
    pub fn evaluate_fully(&self) -> Result<Value> {
        let mut ctx = EvalContext::new(&self.env);
        let viewed = eval::evaluate_fully(&self.tuple, &mut ctx)?;
        Ok(Value::Tuple(viewed))
    }

    /// Render the whole tuple with the loader's stringify style, forcing
    /// as needed.
    pub fn render(&self) -> Result<String> {
        let mut ctx = EvalContext::new(&self.env);
        eval::stringify(
            &Value::Tuple(self.tuple.clone()),
            self.env.options.stringify,
            &mut ctx,
        )
    }

    /// Where `key`'s value came from: the expression that produced it, the
    /// scopes its free names resolved in, and nested evaluations.
    pub fn explain_value(&self, key: &str) -> Result<String> {
        let mut ctx = EvalContext::new(&self.env);
        match eval::tuple_trace(&self.tuple, key, &mut ctx)? {
            None => Ok(format!("`{}` is not defined in this tuple.", key)),
            Some(TupleSlotInfo::Literal) => Ok(format!(
                "`{}` was declared directly in this tuple at {}.",
                key,
                self.tuple.origin()
            )),
            Some(TupleSlotInfo::Unforced(at)) => Ok(format!(
                "`{}` has not been evaluated; defined at {}.",
                key, at
            )),
            Some(TupleSlotInfo::Forced(Some(trace), _)) => Ok(format!(
                "`{}` was computed {}",
                key,
                explain::render(&trace, "from")
            )),
            Some(TupleSlotInfo::Forced(None, at)) => Ok(format!(
                "`{}` was computed from the definition at {}.",
                key, at
            )),
        }
    }
}

impl fmt::Debug for ConfigTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigTuple({:?})", self.tuple)
    }
}
