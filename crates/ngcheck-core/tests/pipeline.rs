//! Integration test: the full analyzer pipeline over a temporary project.
//!
//! A line-oriented stub front end stands in for a real parser so these tests
//! exercise discovery, parallel execution, isolation and ordering without
//! depending on a grammar. Each line `field <name>` declares a field on one
//! component; a line containing `@@` is a syntax error.

use std::path::{Path, PathBuf};

use ngcheck_core::declarative;
use ngcheck_core::model::{
    DeclId, DeclKind, Declaration, Decorator, LineIndex, Literal, Member, MemberId, MemberKind,
    SourceModel, SourceUnit, SyntaxError,
};
use ngcheck_core::{
    Analyzer, Catalog, Config, DiagnosticKind, FactExtractor, FactKind, FactPattern,
    LanguageFrontend, Matcher, Report, RuleSpec, Severity,
};

struct LineFrontend;

impl LanguageFrontend for LineFrontend {
    fn language_id(&self) -> &'static str {
        "lines"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".ts"]
    }

    fn parse(&self, source: &str) -> SourceModel {
        let index = LineIndex::new(source);
        let mut model = SourceModel::default();
        let mut decl = Declaration::new(
            DeclId(0),
            DeclKind::Component,
            "Widget",
            index.span(0, source.len()),
        );
        decl.decorators.push(Decorator {
            name: "Component".into(),
            arguments: vec![Literal::Object(vec![(
                "selector".into(),
                Literal::Str("app-widget".into()),
            )])],
            span: index.span(0, 0),
        });

        let mut offset = 0;
        for line in source.split_inclusive('\n') {
            let text = line.trim_end();
            if let Some(pos) = text.find("@@") {
                model.syntax_errors.push(SyntaxError {
                    span: index.span(offset + pos, 2),
                    message: "unexpected token".into(),
                });
            } else if let Some(name) = text.strip_prefix("field ") {
                decl.members.push(Member {
                    id: MemberId(decl.members.len()),
                    name: name.trim().to_string(),
                    kind: MemberKind::Field,
                    declared_type: None,
                    initializer: None,
                    decorators: Vec::new(),
                    parameters: Vec::new(),
                    span: index.span(offset, text.len()),
                });
            }
            offset += line.len();
        }
        model.declarations.push(decl);
        model
    }
}

fn builtin() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new(
            "default-change-detection",
            "T001",
            Severity::Info,
            "Default change detection",
            Matcher::each(FactPattern::new(FactKind::DetectionStrategy).eq("strategy", "Default")),
        ),
        RuleSpec::new(
            "field-seen",
            "T002",
            Severity::Warning,
            "Field declared",
            Matcher::each(FactPattern::new(FactKind::MemberDeclared)),
        )
        .message("field `{name}` declared"),
    ]
}

fn analyze(root: &Path, config: Config, rules: Vec<RuleSpec>) -> Report {
    let catalog = Catalog::load(rules, FactExtractor::produced_kinds()).expect("catalog loads");
    Analyzer::builder()
        .root(root)
        .frontend(LineFrontend)
        .catalog(catalog)
        .config(config)
        .build()
        .expect("analyzer builds")
        .analyze(&[PathBuf::from(".")])
        .expect("analysis runs")
}

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[test]
fn one_malformed_file_among_ten_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..9 {
        write(dir.path(), &format!("src/w{i}.component.ts"), "field a\nfield b\n");
    }
    write(dir.path(), "src/broken.component.ts", "field a\n  @@\n");

    let report = analyze(dir.path(), Config::default(), builtin());

    assert_eq!(report.files_checked, 10);
    let malformed: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::MalformedSource)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].location.file, PathBuf::from("src/broken.component.ts"));
    assert_eq!((malformed[0].location.line, malformed[0].location.column), (2, 3));

    // Nine healthy units each report the component plus two fields.
    assert_eq!(report.by_rule("default-change-detection").len(), 9);
    assert_eq!(report.by_rule("field-seen").len(), 18);
    assert_eq!(report.max_severity(), Some(Severity::Error));
    assert_eq!(report.exit_code(Severity::Error), 1);
}

#[test]
fn offsets_are_non_decreasing_per_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ts", "field z\nfield y\nfield x\n");
    write(dir.path(), "b.ts", "field only\n");

    let report = analyze(dir.path(), Config::default(), builtin());

    let files: Vec<&Path> = report.diagnostics.iter().map(|d| d.location.file.as_path()).collect();
    let mut sorted = files.clone();
    sorted.sort();
    assert_eq!(files, sorted);
    for pair in report.diagnostics.windows(2) {
        if pair[0].location.file == pair[1].location.file {
            assert!(pair[0].location.offset <= pair[1].location.offset);
        }
    }
    // The component and the first field both start at offset 0: catalog order wins.
    let first: Vec<&str> = report.diagnostics[..2].iter().map(|d| d.rule.as_str()).collect();
    assert_eq!(first, vec!["default-change-detection", "field-seen"]);
    assert_eq!(report.diagnostics[1].message, "field `z` declared");
}

#[test]
fn empty_input_set_yields_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let report = analyze(dir.path(), Config::default(), builtin());
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.files_checked, 0);
    assert_eq!(report.exit_code(Severity::Info), 0);
}

#[test]
fn extraction_is_deterministic() {
    let text = "field a\nfield b\nfield c\n".to_string();
    let model = LineFrontend.parse(&text);
    let unit = SourceUnit::new(Path::new("w.ts"), Path::new(""), text, model);
    let extractor = FactExtractor::new();
    let first = extractor.extract(&unit).unwrap();
    let second = extractor.extract(&unit).unwrap();
    assert_eq!(first, second);
    assert!(first.iter().any(|f| f.kind == FactKind::MemberDeclared));
}

#[test]
fn runs_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..6 {
        write(dir.path(), &format!("m{i}.ts"), "field a\nfield b\n");
    }
    let a = analyze(dir.path(), Config::default(), builtin());
    let b = analyze(dir.path(), Config::default(), builtin());
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn config_shapes_the_catalog() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ts", "field a\n");
    write(dir.path(), "generated/b.ts", "field b\n");

    let config = Config::parse(
        r#"
only = ["T002"]

[analyzer]
exclude = ["**/generated/**"]

[rules.field-seen]
severity = "error"
"#,
    )
    .unwrap();
    let report = analyze(dir.path(), config, builtin());
    assert_eq!(report.files_checked, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].rule, "field-seen");
    assert_eq!(report.diagnostics[0].severity, Severity::Error);
}

#[test]
fn custom_rules_run_alongside_builtins() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ts", "field user$\nfield count\n");

    let toml = r#"
[[custom-rule]]
id = "no-dollar-fields"
code = "APP001"
title = "Observable field"
severity = "error"
fact = "member-declared"
where = { name = ["user$", "items$"] }
message = "`{name}` should be a signal"
"#;
    let mut rules = builtin();
    rules.extend(declarative::load_rules_from_toml(toml).unwrap());
    let report = analyze(dir.path(), Config::parse(toml).unwrap(), rules);

    let custom = report.by_rule("no-dollar-fields");
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].message, "`user$` should be a signal");
    assert_eq!(custom[0].severity, Severity::Error);
}

#[test]
fn custom_rule_with_duplicate_code_fails_to_load() {
    let toml = r#"
[[custom-rule]]
id = "clash"
code = "T001"
title = "Clash"
fact = "teardown-hook"
"#;
    let mut rules = builtin();
    rules.extend(declarative::load_rules_from_toml(toml).unwrap());
    let err = Catalog::load(rules, FactExtractor::produced_kinds()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "rules `default-change-detection` and `clash` share code `T001`"
    );
}
