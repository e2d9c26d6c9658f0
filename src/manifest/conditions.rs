//! Evaluation of `when` conditions.
//!
//! Conditions are minijinja expressions over the variant: `platform` and
//! `render` are lowercase strings, `debug` and `optimize` booleans. Unknown
//! names are errors rather than silently false.

use minijinja::{Environment, UndefinedBehavior, Value, context};

use super::ManifestError;
use crate::variant::Variant;

/// Evaluates conditions against one variant.
pub struct Conditions {
    env: Environment<'static>,
    ctx: Value,
}

impl Conditions {
    /// Prepare an evaluator for `variant`.
    #[must_use]
    pub fn new(variant: &Variant) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let ctx = context! {
            platform => variant.platform.as_str(),
            render => variant.render.as_str(),
            debug => variant.debug,
            optimize => variant.optimize,
        };
        Self { env, ctx }
    }

    /// Whether `when` selects its entry. A missing condition always holds.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Condition`] when the expression does not
    /// compile or references an unknown name.
    pub fn holds(&self, when: Option<&str>) -> Result<bool, ManifestError> {
        let Some(expression) = when else {
            return Ok(true);
        };
        let wrap = |source| ManifestError::Condition {
            expression: expression.to_owned(),
            source: Box::new(source),
        };
        let compiled = self.env.compile_expression(expression).map_err(wrap)?;
        let value = compiled.eval(&self.ctx).map_err(wrap)?;
        if value.is_undefined() {
            return Err(wrap(minijinja::Error::new(
                minijinja::ErrorKind::UndefinedError,
                "condition evaluated to an undefined value",
            )));
        }
        Ok(value.is_true())
    }
}
