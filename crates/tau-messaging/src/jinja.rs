//! Predicate evaluator backed by minijinja expressions and templates.

use std::sync::Arc;

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;

use crate::collaborators::{EvalContext, PredicateError, PredicateEvaluator};

type ContextProvider = Arc<dyn Fn() -> Option<Value> + Send + Sync>;

/// Evaluates triggers as minijinja expressions against host-supplied attributes.
///
/// Undefined lookups are strict: a trigger naming a missing attribute fails instead of
/// evaluating to false.
pub struct JinjaPredicateEvaluator {
    environment: Environment<'static>,
    context_provider: ContextProvider,
}

impl JinjaPredicateEvaluator {
    /// `context_provider` is called once per selection; returning `None` or a non-object
    /// value means nothing can be evaluated right now.
    pub fn new<F>(context_provider: F) -> Self
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        let mut environment = Environment::new();
        environment.set_undefined_behavior(UndefinedBehavior::Strict);
        Self {
            environment,
            context_provider: Arc::new(context_provider),
        }
    }

    pub fn with_static_context(attributes: Value) -> Self {
        Self::new(move || Some(attributes.clone()))
    }
}

impl PredicateEvaluator for JinjaPredicateEvaluator {
    fn create_context(&self) -> Option<EvalContext> {
        (self.context_provider)().and_then(EvalContext::from_value)
    }

    fn evaluate(&self, expression: &str, context: &EvalContext) -> Result<bool, PredicateError> {
        let evaluation_error = |error: minijinja::Error| PredicateError::Evaluation {
            expression: expression.to_string(),
            detail: error.to_string(),
        };
        let compiled = self
            .environment
            .compile_expression(expression)
            .map_err(evaluation_error)?;
        let value = compiled
            .eval(context.attributes())
            .map_err(evaluation_error)?;
        if value.is_undefined() {
            return Err(PredicateError::UndefinedValue {
                expression: expression.to_string(),
            });
        }
        Ok(value.is_true())
    }

    fn substitute(&self, template: &str, context: &EvalContext) -> Result<String, PredicateError> {
        self.environment
            .render_str(template, context.attributes())
            .map_err(|error| PredicateError::Substitution {
                template: template.to_string(),
                detail: error.to_string(),
            })
    }
}
