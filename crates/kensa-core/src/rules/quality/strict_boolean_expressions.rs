//! strict-boolean-expressions rule (Q002): Restricts the types allowed in boolean contexts
//!
//! Every condition site (if/while/do/for tests, ternary tests, `!` operands,
//! `&&`/`||` operands and inline array predicates) is classified by the
//! narrowing engine; the first matching category below is reported.

use serde::Deserialize;
use tracing::{Level, span, trace};

use crate::declare_rule;
use crate::diagnostic::{Diagnostic, Fix};
use crate::program::SiteOrigin;
use crate::rules::helpers::{is_primary_expr, needs_parens, parenthesize};
use crate::rules::{OptionsError, Rule, RuleContext, RuleMetadata};
use crate::semantic::{NarrowingEngine, ResolvedSite, SourcePosition, VariantKind, VariantSet};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StrictBooleanOptions {
    pub allow_any: bool,
    pub allow_nullable_boolean: bool,
    pub allow_nullable_enum: bool,
    pub allow_nullable_number: bool,
    pub allow_nullable_object: bool,
    pub allow_nullable_string: bool,
    pub allow_number: bool,
    pub allow_string: bool,
    pub ignore_in_binary_expression: bool,
    #[serde(rename = "allowRuleToRunWithoutStrictNullChecksIKnowWhatIAmDoing")]
    pub allow_without_strict_null_checks: bool,
}

impl Default for StrictBooleanOptions {
    fn default() -> Self {
        Self {
            allow_any: false,
            allow_nullable_boolean: false,
            allow_nullable_enum: false,
            allow_nullable_number: false,
            allow_nullable_object: true,
            allow_nullable_string: false,
            allow_number: true,
            allow_string: true,
            ignore_in_binary_expression: false,
            allow_without_strict_null_checks: false,
        }
    }
}

declare_rule!(
    StrictBooleanExpressions,
    id = "Q002",
    name = "strict-boolean-expressions",
    description = "Disallow certain types in boolean expressions",
    category = TypeAware,
    severity = Warning,
    options = StrictBooleanOptions,
    docs_url = "https://typescript-eslint.io/rules/strict-boolean-expressions"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionError {
    Other,
    Any,
    Nullish,
    NullableBoolean,
    String,
    NullableString,
    Number,
    NullableNumber,
    Object,
    NullableObject,
    NullableEnum,
}

impl ConditionError {
    pub fn message_id(self) -> &'static str {
        match self {
            ConditionError::Other => "conditionErrorOther",
            ConditionError::Any => "conditionErrorAny",
            ConditionError::Nullish => "conditionErrorNullish",
            ConditionError::NullableBoolean => "conditionErrorNullableBoolean",
            ConditionError::String => "conditionErrorString",
            ConditionError::NullableString => "conditionErrorNullableString",
            ConditionError::Number => "conditionErrorNumber",
            ConditionError::NullableNumber => "conditionErrorNullableNumber",
            ConditionError::Object => "conditionErrorObject",
            ConditionError::NullableObject => "conditionErrorNullableObject",
            ConditionError::NullableEnum => "conditionErrorNullableEnum",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ConditionError::Other => {
                "Unexpected value in conditional. A boolean expression is required."
            }
            ConditionError::Any => {
                "Unexpected any value in conditional. An explicit comparison or type cast is required."
            }
            ConditionError::Nullish => {
                "Unexpected nullish value in conditional. The condition is always false."
            }
            ConditionError::NullableBoolean => {
                "Unexpected nullable boolean value in conditional. Please handle the nullish case explicitly."
            }
            ConditionError::String => {
                "Unexpected string value in conditional. An explicit empty string check is required."
            }
            ConditionError::NullableString => {
                "Unexpected nullable string value in conditional. Please handle the nullish/empty cases explicitly."
            }
            ConditionError::Number => {
                "Unexpected number value in conditional. An explicit zero/NaN check is required."
            }
            ConditionError::NullableNumber => {
                "Unexpected nullable number value in conditional. Please handle the nullish/zero/NaN cases explicitly."
            }
            ConditionError::Object => {
                "Unexpected object value in conditional. The condition is always true."
            }
            ConditionError::NullableObject => {
                "Unexpected nullable object value in conditional. An explicit null check is required."
            }
            ConditionError::NullableEnum => {
                "Unexpected nullable enum value in conditional. Please handle the nullish/zero/NaN cases explicitly."
            }
        }
    }
}

const NO_STRICT_NULL_CHECK: &str =
    "This rule requires the `strictNullChecks` compiler option to be turned on to function correctly.";

/// Replacement shapes offered as fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixShape {
    BooleanCast,
    NullishFalse,
    NotNull,
    NotEmptyString,
    NotZero,
}

impl FixShape {
    fn title(self) -> &'static str {
        match self {
            FixShape::BooleanCast => "Explicitly cast value to a boolean (`Boolean(value)`)",
            FixShape::NullishFalse => "Explicitly treat nullish value the same as false (`value ?? false`)",
            FixShape::NotNull => "Change condition to check for null/undefined (`value != null`)",
            FixShape::NotEmptyString => "Change condition to check for empty string (`value !== \"\"`)",
            FixShape::NotZero => "Change condition to check for 0 (`value !== 0`)",
        }
    }

    fn fixes(error: ConditionError) -> &'static [FixShape] {
        match error {
            ConditionError::Any | ConditionError::Nullish => &[FixShape::BooleanCast],
            ConditionError::NullableBoolean => &[FixShape::NullishFalse],
            ConditionError::NullableString
            | ConditionError::NullableNumber
            | ConditionError::NullableObject
            | ConditionError::NullableEnum => &[FixShape::NotNull],
            ConditionError::String => &[FixShape::NotEmptyString, FixShape::BooleanCast],
            ConditionError::Number => &[FixShape::NotZero, FixShape::BooleanCast],
            ConditionError::Object | ConditionError::Other => &[],
        }
    }
}

impl StrictBooleanExpressions {
    /// First category the kind set falls into, or `None` when the condition
    /// is acceptable under the current options.
    pub fn condition_error(&self, kinds: VariantSet) -> Option<ConditionError> {
        use VariantKind::*;
        let options = &self.options;

        if kinds.is(&[Boolean]) || kinds.is(&[TruthyBoolean]) || kinds.is(&[Never]) {
            return None;
        }
        if kinds.is(&[Nullish]) {
            return Some(ConditionError::Nullish);
        }
        if kinds.is(&[Nullish, TruthyBoolean]) {
            return None;
        }
        if kinds.is(&[Nullish, Boolean]) {
            return (!options.allow_nullable_boolean).then_some(ConditionError::NullableBoolean);
        }
        if (options.allow_number && kinds.is(&[Nullish, TruthyNumber]))
            || (options.allow_string && kinds.is(&[Nullish, TruthyString]))
        {
            return None;
        }
        if kinds.is(&[String]) || kinds.is(&[TruthyString]) {
            return (!options.allow_string).then_some(ConditionError::String);
        }
        if kinds.is(&[Nullish, String]) {
            return (!options.allow_nullable_string).then_some(ConditionError::NullableString);
        }
        if kinds.is(&[Number]) || kinds.is(&[TruthyNumber]) {
            return (!options.allow_number).then_some(ConditionError::Number);
        }
        if kinds.is(&[Nullish, Number]) {
            return (!options.allow_nullable_number).then_some(ConditionError::NullableNumber);
        }
        if kinds.is(&[Object]) {
            return Some(ConditionError::Object);
        }
        if kinds.is(&[Nullish, Object]) {
            return (!options.allow_nullable_object).then_some(ConditionError::NullableObject);
        }
        if kinds.contains(Nullish)
            && kinds.contains(Enum)
            && kinds.is_subset_of(&[
                Nullish,
                Enum,
                Number,
                TruthyNumber,
                String,
                TruthyString,
            ])
        {
            return (!options.allow_nullable_enum).then_some(ConditionError::NullableEnum);
        }
        if kinds.is(&[Any]) {
            return (!options.allow_any).then_some(ConditionError::Any);
        }
        Some(ConditionError::Other)
    }

    fn fix(
        &self,
        ctx: &RuleContext<'_, '_, '_>,
        site: &ResolvedSite<'_>,
        position: &SourcePosition,
        shape: FixShape,
    ) -> Option<Fix> {
        let text = ctx.source_text(site.span)?;
        let replacement = match shape {
            FixShape::BooleanCast => {
                return Some(Fix::replace(shape.title(), format!("Boolean({text})"), position));
            }
            FixShape::NullishFalse => "?? false",
            FixShape::NotNull => "!= null",
            FixShape::NotEmptyString => "!== \"\"",
            FixShape::NotZero => "!== 0",
        };

        let operand = if is_primary_expr(site.expr) {
            text.to_string()
        } else {
            parenthesize(text)
        };
        let mut new_text = format!("{operand} {replacement}");
        if needs_parens(ctx.file().source(), position.start, position.end) {
            new_text = parenthesize(&new_text);
        }
        Some(Fix::replace(shape.title(), new_text, position))
    }

    fn report(
        &self,
        ctx: &RuleContext<'_, '_, '_>,
        site: &ResolvedSite<'_>,
        error: ConditionError,
    ) -> Option<Diagnostic> {
        let position = ctx.position(site.span)?;
        let mut diagnostic = Diagnostic::at(
            self.metadata.id,
            self.metadata.severity,
            error.message(),
            ctx.filename(),
            &position,
        )
        .with_message_id(error.message_id());

        for shape in FixShape::fixes(error) {
            if let Some(fix) = self.fix(ctx, site, &position, *shape) {
                diagnostic = diagnostic.with_fix(fix);
            }
        }
        Some(diagnostic)
    }
}

impl Rule for StrictBooleanExpressions {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn configure(&mut self, options: &serde_json::Value) -> Result<(), OptionsError> {
        self.options =
            serde_json::from_value(options.clone()).map_err(|source| OptionsError::Malformed {
                rule: "strict-boolean-expressions",
                source,
            })?;
        Ok(())
    }

    fn check(&self, ctx: &RuleContext<'_, '_, '_>) -> Vec<Diagnostic> {
        let _span =
            span!(Level::TRACE, "strict_boolean_expressions", file = ctx.filename()).entered();
        if !ctx.file().metadata().language.is_typescript() {
            return Vec::new();
        }

        if !ctx.compiler().strict_null_checks && !self.options.allow_without_strict_null_checks {
            let position = SourcePosition::file_start();
            return vec![
                Diagnostic::at(
                    self.metadata.id,
                    self.metadata.severity,
                    NO_STRICT_NULL_CHECK,
                    ctx.filename(),
                    &position,
                )
                .with_message_id("noStrictNullCheck"),
            ];
        }

        let engine = NarrowingEngine::new(ctx.index(), ctx.defuse());
        let mut diagnostics = Vec::new();

        for site in ctx.sites() {
            if self.options.ignore_in_binary_expression
                && site.origin == SiteOrigin::LogicalOperand
            {
                continue;
            }
            let classification = engine.classify_condition(site);
            let Some(error) = self.condition_error(classification.kinds) else {
                continue;
            };
            trace!(kinds = %classification.kinds, ?error, "condition reported");
            if let Some(diagnostic) = self.report(ctx, site, error) {
                diagnostics.push(diagnostic);
            }
        }

        diagnostics
    }
}
