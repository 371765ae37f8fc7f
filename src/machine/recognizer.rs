//! Recognition of step functions and initializers by signature shape.

use super::condition::DEFAULT_MAX_CONDITION_LEN;
use super::method::{MethodKind, StepFunction};
use super::trace::trace_function_body;
use crate::core::{Field, FuncDecl, Import, SourceFile};

pub const STATE_UPDATE_TYPE: &str = "StateUpdate";
pub const INIT_FUNC_TYPE: &str = "InitFunc";
pub const GET_INIT_STATE_FOR: &str = "GetInitStateFor";
pub const GET_SUBROUTINE_INIT_STATE: &str = "GetSubroutineInitState";

/// Framework package recognized when nothing else is configured.
pub const DEFAULT_FRAMEWORK_PACKAGE: &str =
    "github.com/insolar/assured-ledger/ledger-core/conveyor/smachine";

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    /// Import path of the state machine framework.
    pub framework_package: String,
    pub max_condition_len: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            framework_package: DEFAULT_FRAMEWORK_PACKAGE.to_string(),
            max_condition_len: DEFAULT_MAX_CONDITION_LEN,
        }
    }
}

/// Per-file state consulted while recognizing and tracing.
pub struct FileContext<'a> {
    pub file: &'a SourceFile,
    /// Local qualifier of the framework package in this file.
    pub framework: String,
    pub max_condition_len: usize,
}

impl<'a> FileContext<'a> {
    pub fn new(file: &'a SourceFile, framework: impl Into<String>, max_condition_len: usize) -> Self {
        Self {
            file,
            framework: framework.into(),
            max_condition_len,
        }
    }
}

/// Local qualifier under which `package` is imported, if it is.
///
/// The alias wins over the last path segment. A dot import maps to the empty
/// qualifier and a blank import does not count.
pub fn framework_qualifier(imports: &[Import], package: &str) -> Option<String> {
    let import = imports.iter().find(|import| import.path == package)?;
    match import.name.as_deref() {
        Some("_") => None,
        Some(".") => Some(String::new()),
        Some(alias) => Some(alias.to_string()),
        None => Some(
            package
                .rsplit_once('/')
                .map_or(package, |(_, last)| last)
                .to_string(),
        ),
    }
}

/// Recognizes and traces every step function of `file`.
pub fn analyze_file(file: &SourceFile, options: &AnalysisOptions) -> Vec<StepFunction> {
    let Some(framework) = framework_qualifier(&file.imports, &options.framework_package) else {
        log::debug!(
            "{} does not import {}",
            file.path.display(),
            options.framework_package
        );
        return Vec::new();
    };

    let env = FileContext::new(file, framework, options.max_condition_len);
    let mut steps = Vec::new();

    for decl in &file.decls {
        let Some(mut step) = recognize(decl, &env.framework) else {
            continue;
        };
        if let Some(body) = &decl.body {
            trace_function_body(&mut step, body, &env);
        }
        steps.push(step);
    }

    log::debug!(
        "{}: {} step function(s) recognized",
        file.path.display(),
        steps.len()
    );
    steps
}

/// Builds a step skeleton from `decl` when its signature qualifies.
pub fn recognize(decl: &FuncDecl, framework: &str) -> Option<StepFunction> {
    if decl.results.is_empty() {
        return None;
    }

    let (mut step, check_context) =
        match find_result_arg(&decl.results, framework, STATE_UPDATE_TYPE, false) {
            Some((index, update_arg)) => {
                let mut step = StepFunction::new("", decl.name.as_str(), MethodKind::PlainStep);
                step.update_index = index;
                step.update_arg = update_arg;
                (step, true)
            }
            None => match decl.name.as_str() {
                GET_INIT_STATE_FOR | GET_SUBROUTINE_INIT_STATE => {
                    find_result_arg(&decl.results, framework, INIT_FUNC_TYPE, true)?;
                    (
                        StepFunction::new("", decl.name.as_str(), MethodKind::Initializer),
                        false,
                    )
                }
                _ => return None,
            },
        };

    if let Some(receiver) = &decl.receiver {
        let [field] = receiver.as_slice() else {
            return None;
        };
        match field.names.as_slice() {
            [] => {}
            [name] => step.receiver_name = Some(name.clone()),
            _ => return None,
        }
        match field.ty.type_parts() {
            ("", name) if !name.is_empty() => step.receiver_type = name.to_string(),
            _ => return None,
        }
    }

    if check_context {
        if let Some((kind, arg)) = find_context_arg(&decl.params, framework) {
            step.kind = kind;
            step.context_arg = arg;
        }
    }

    Some(step)
}

/// Finds the single result of type `framework.type_name`.
///
/// Returns its 1-based position and name. Any ambiguity yields `None`. With
/// `only_one`, the result list must consist of that one field.
pub fn find_result_arg(
    results: &[Field],
    framework: &str,
    type_name: &str,
    only_one: bool,
) -> Option<(usize, Option<String>)> {
    let mut position = 0;
    let mut found = None;

    for field in results {
        let matches = !field.variadic && field.ty.selector_parts() == (framework, type_name);
        match field.names.len() {
            0 | 1 => {}
            _ if only_one || matches => return None,
            n => {
                position += n;
                continue;
            }
        }
        if only_one && position > 0 {
            return None;
        }
        position += 1;

        if !matches {
            continue;
        }
        if found.is_some() {
            return None;
        }
        found = Some((position, field.first_name().map(str::to_string)));
    }

    found
}

/// Finds the first parameter typed as a framework context.
pub fn find_context_arg(params: &[Field], framework: &str) -> Option<(MethodKind, String)> {
    params.iter().find_map(|param| {
        let (qualifier, name) = param.ty.selector_parts();
        if qualifier != framework {
            return None;
        }
        let kind = MethodKind::from_context_type(name)?;
        let arg = param.first_name().unwrap_or_default().to_string();
        Some((kind, arg))
    })
}
