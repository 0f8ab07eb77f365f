//! Settings translation.
//!
//! One [`RuffSettings`] feeds two outputs: the nested settings object sent to
//! `ruff server`, and the flag list passed to `ruff check`. Both emit only
//! values that are present and non-empty. Omitting a key is how ruff is told
//! to fall back to its own `pyproject.toml`/`ruff.toml`, so a default must
//! never be injected.
//!
//! The two forms are not symmetric: `lint.use_noqa = false` becomes
//! `ignoreNoqa: true` for the server and `--ignore-noqa` for the CLI.

use serde_json::{Map, Value, json};

use crate::settings::RuffSettings;

/// Nested settings object for `initializationOptions.settings` and
/// `workspace/configuration` replies.
#[must_use]
pub fn server_settings(settings: &RuffSettings) -> Value {
    let mut root = Map::new();

    insert_str(&mut root, "configuration", settings.configuration.as_deref());
    insert_positive(&mut root, "lineLength", settings.line_length);
    insert_str(&mut root, "targetVersion", settings.target_version.as_deref());
    insert_list(&mut root, "exclude", &settings.exclude);

    let lint = &settings.lint;
    let mut lint_map = Map::new();
    insert_bool(&mut lint_map, "enable", lint.enable);
    insert_bool(&mut lint_map, "preview", lint.preview);
    if lint.use_noqa == Some(false) {
        lint_map.insert("ignoreNoqa".to_string(), Value::Bool(true));
    }
    insert_list(&mut lint_map, "select", &lint.select);
    insert_list(&mut lint_map, "ignore", &lint.ignore);
    insert_list(&mut lint_map, "extendSelect", &lint.extend_select);
    insert_list(&mut lint_map, "extendIgnore", &lint.extend_ignore);
    insert_list(&mut lint_map, "fixable", &lint.fixable);
    insert_list(&mut lint_map, "unfixable", &lint.unfixable);
    insert_object(&mut root, "lint", lint_map);

    insert_bool(&mut root, "showSyntaxErrors", settings.show_syntax_errors);

    let format = &settings.format;
    let mut format_map = Map::new();
    insert_bool(&mut format_map, "preview", format.preview);
    insert_str(
        &mut format_map,
        "indentStyle",
        format.indent_style.map(|style| style.as_str()),
    );
    insert_positive(&mut format_map, "indentWidth", format.indent_width);
    insert_str(
        &mut format_map,
        "quoteStyle",
        format.quote_style.map(|style| style.as_str()),
    );
    insert_object(&mut root, "format", format_map);

    let mut code_action_map = Map::new();
    if let Some(enable) = settings.code_action.fix_violation {
        code_action_map.insert("fixViolation".to_string(), json!({ "enable": enable }));
    }
    if let Some(enable) = settings.code_action.disable_rule_comment {
        code_action_map.insert(
            "disableRuleComment".to_string(),
            json!({ "enable": enable }),
        );
    }
    insert_object(&mut root, "codeAction", code_action_map);

    insert_bool(&mut root, "organizeImports", settings.organize_imports);
    insert_bool(&mut root, "fixAll", settings.fix_all);

    Value::Object(root)
}

/// `initializationOptions` payload: `{ "settings": { ... } }`.
#[must_use]
pub fn initialization_options(settings: &RuffSettings) -> Value {
    json!({ "settings": server_settings(settings) })
}

/// Payload for a `workspace/configuration` pull: `{ "ruff": { ... } }`.
#[must_use]
pub fn workspace_configuration(settings: &RuffSettings) -> Value {
    json!({ "ruff": server_settings(settings) })
}

/// Flags for `ruff check`, in a stable order.
#[must_use]
pub fn cli_args(settings: &RuffSettings) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(path) = non_empty(settings.configuration.as_deref()) {
        args.push(format!("--config={path}"));
    }
    if let Some(length) = settings.line_length.filter(|&n| n > 0) {
        args.push(format!("--line-length={length}"));
    }
    if let Some(version) = non_empty(settings.target_version.as_deref()) {
        args.push(format!("--target-version={version}"));
    }
    for pattern in non_empty_items(&settings.exclude) {
        args.push(format!("--exclude={pattern}"));
    }

    let lint = &settings.lint;
    if lint.preview == Some(true) {
        args.push("--preview".to_string());
    }
    if lint.use_noqa == Some(false) {
        args.push("--ignore-noqa".to_string());
    }
    push_joined(&mut args, "--select", &lint.select);
    push_joined(&mut args, "--ignore", &lint.ignore);
    push_joined(&mut args, "--extend-select", &lint.extend_select);
    push_joined(&mut args, "--extend-ignore", &lint.extend_ignore);
    push_joined(&mut args, "--fixable", &lint.fixable);
    push_joined(&mut args, "--unfixable", &lint.unfixable);

    args
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn insert_str(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = non_empty(value) {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn insert_bool(map: &mut Map<String, Value>, key: &str, value: Option<bool>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::Bool(value));
    }
}

fn insert_positive(map: &mut Map<String, Value>, key: &str, value: Option<u32>) {
    if let Some(value) = value.filter(|&n| n > 0) {
        map.insert(key.to_string(), Value::from(value));
    }
}

/// List entries that carry a value; blank patterns and codes are dropped.
fn non_empty_items(values: &[String]) -> Vec<&str> {
    values
        .iter()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .collect()
}

fn insert_list(map: &mut Map<String, Value>, key: &str, values: &[String]) {
    let items = non_empty_items(values);
    if !items.is_empty() {
        map.insert(key.to_string(), Value::from(items));
    }
}

fn insert_object(map: &mut Map<String, Value>, key: &str, object: Map<String, Value>) {
    if !object.is_empty() {
        map.insert(key.to_string(), Value::Object(object));
    }
}

fn push_joined(args: &mut Vec<String>, flag: &str, values: &[String]) {
    let items = non_empty_items(values);
    if !items.is_empty() {
        args.push(format!("{flag}={}", items.join(",")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{IndentStyle, QuoteStyle};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_settings_emit_nothing() {
        let settings = RuffSettings::default();
        assert_eq!(server_settings(&settings), json!({}));
        assert!(cli_args(&settings).is_empty());
    }

    #[test]
    fn zero_and_empty_values_emit_nothing() {
        let mut settings = RuffSettings {
            configuration: Some(String::new()),
            line_length: Some(0),
            target_version: Some(String::new()),
            ..RuffSettings::default()
        };
        settings.format.indent_width = Some(0);
        assert_eq!(server_settings(&settings), json!({}));
        assert!(cli_args(&settings).is_empty());
    }

    #[test]
    fn line_length_and_select_example() {
        let mut settings = RuffSettings {
            line_length: Some(100),
            ..RuffSettings::default()
        };
        settings.lint.select = strings(&["E", "F"]);

        assert_eq!(cli_args(&settings), vec!["--line-length=100", "--select=E,F"]);
        assert_eq!(
            server_settings(&settings),
            json!({ "lineLength": 100, "lint": { "select": ["E", "F"] } })
        );
    }

    #[test]
    fn blank_list_entries_are_dropped_in_both_forms() {
        let mut settings = RuffSettings {
            exclude: strings(&[""]),
            ..RuffSettings::default()
        };
        settings.lint.select = strings(&["", "E"]);
        settings.lint.ignore = strings(&[""]);

        assert_eq!(
            server_settings(&settings),
            json!({ "lint": { "select": ["E"] } })
        );
        assert_eq!(cli_args(&settings), vec!["--select=E"]);
    }

    #[test]
    fn exclude_is_repeated_in_cli_form() {
        let settings = RuffSettings {
            exclude: strings(&["build", "dist"]),
            ..RuffSettings::default()
        };
        assert_eq!(
            cli_args(&settings),
            vec!["--exclude=build", "--exclude=dist"]
        );
        assert_eq!(
            server_settings(&settings),
            json!({ "exclude": ["build", "dist"] })
        );
    }

    #[test]
    fn use_noqa_false_is_asymmetric() {
        let mut settings = RuffSettings::default();
        settings.lint.use_noqa = Some(false);
        assert_eq!(
            server_settings(&settings),
            json!({ "lint": { "ignoreNoqa": true } })
        );
        assert_eq!(cli_args(&settings), vec!["--ignore-noqa"]);
    }

    #[test]
    fn use_noqa_true_emits_nothing() {
        let mut settings = RuffSettings::default();
        settings.lint.use_noqa = Some(true);
        assert_eq!(server_settings(&settings), json!({}));
        assert!(cli_args(&settings).is_empty());
    }

    #[test]
    fn preview_false_is_sent_to_server_but_not_cli() {
        let mut settings = RuffSettings::default();
        settings.lint.preview = Some(false);
        assert_eq!(
            server_settings(&settings),
            json!({ "lint": { "preview": false } })
        );
        assert!(cli_args(&settings).is_empty());
    }

    #[test]
    fn all_cli_flags_in_order() {
        let mut settings = RuffSettings {
            configuration: Some("/cfg/ruff.toml".to_string()),
            line_length: Some(120),
            target_version: Some("py312".to_string()),
            exclude: strings(&["venv"]),
            ..RuffSettings::default()
        };
        settings.lint.preview = Some(true);
        settings.lint.use_noqa = Some(false);
        settings.lint.select = strings(&["E", "W"]);
        settings.lint.ignore = strings(&["E501"]);
        settings.lint.extend_select = strings(&["I"]);
        settings.lint.extend_ignore = strings(&["D100", "D101"]);
        settings.lint.fixable = strings(&["ALL"]);
        settings.lint.unfixable = strings(&["F401"]);

        assert_eq!(
            cli_args(&settings),
            vec![
                "--config=/cfg/ruff.toml",
                "--line-length=120",
                "--target-version=py312",
                "--exclude=venv",
                "--preview",
                "--ignore-noqa",
                "--select=E,W",
                "--ignore=E501",
                "--extend-select=I",
                "--extend-ignore=D100,D101",
                "--fixable=ALL",
                "--unfixable=F401",
            ]
        );
    }

    #[test]
    fn server_only_settings_do_not_leak_into_cli() {
        let mut settings = RuffSettings {
            show_syntax_errors: Some(false),
            organize_imports: Some(true),
            fix_all: Some(true),
            executable_path: Some("/usr/bin/ruff".into()),
            ..RuffSettings::default()
        };
        settings.lint.enable = Some(true);
        settings.format.quote_style = Some(QuoteStyle::Double);
        settings.code_action.fix_violation = Some(false);
        assert!(cli_args(&settings).is_empty());
    }

    #[test]
    fn full_server_settings_shape() {
        let mut settings = RuffSettings {
            configuration: Some("~/ruff.toml".to_string()),
            show_syntax_errors: Some(true),
            organize_imports: Some(false),
            fix_all: Some(true),
            ..RuffSettings::default()
        };
        settings.lint.enable = Some(true);
        settings.lint.extend_select = strings(&["B"]);
        settings.lint.unfixable = strings(&["B905"]);
        settings.format.preview = Some(true);
        settings.format.indent_style = Some(IndentStyle::Space);
        settings.format.indent_width = Some(4);
        settings.format.quote_style = Some(QuoteStyle::Preserve);
        settings.code_action.fix_violation = Some(true);
        settings.code_action.disable_rule_comment = Some(false);

        assert_eq!(
            server_settings(&settings),
            json!({
                "configuration": "~/ruff.toml",
                "lint": {
                    "enable": true,
                    "extendSelect": ["B"],
                    "unfixable": ["B905"]
                },
                "showSyntaxErrors": true,
                "format": {
                    "preview": true,
                    "indentStyle": "space",
                    "indentWidth": 4,
                    "quoteStyle": "preserve"
                },
                "codeAction": {
                    "fixViolation": { "enable": true },
                    "disableRuleComment": { "enable": false }
                },
                "organizeImports": false,
                "fixAll": true
            })
        );
    }

    #[test]
    fn executable_path_is_never_forwarded() {
        let settings = RuffSettings {
            executable_path: Some("/usr/bin/ruff".into()),
            ..RuffSettings::default()
        };
        assert_eq!(server_settings(&settings), json!({}));
    }

    #[test]
    fn payload_wrappers() {
        let settings = RuffSettings {
            line_length: Some(79),
            ..RuffSettings::default()
        };
        assert_eq!(
            initialization_options(&settings),
            json!({ "settings": { "lineLength": 79 } })
        );
        assert_eq!(
            workspace_configuration(&settings),
            json!({ "ruff": { "lineLength": 79 } })
        );
    }
}
