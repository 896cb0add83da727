//! Integration test: TypeScript sources through the core fact extractor.

use std::path::Path;

use ngcheck_core::model::SourceUnit;
use ngcheck_core::{Fact, FactExtractor, FactKind, LanguageFrontend, Value};
use ngcheck_ts::TypeScriptFrontend;

const DASHBOARD: &str = r#"
import { Component, OnInit, inject, signal, computed, effect } from '@angular/core';

@Component({
  selector: 'app-dashboard',
  template: `
    <ul>
      <li *ngFor="let order of orders$ | async">{{ format(order) }}</li>
    </ul>
    @for (item of items(); track item.id) {
      <app-item [item]="item" (remove)="remove(item)"></app-item>
    }
  `,
})
export class DashboardComponent implements OnInit {
  private readonly api = inject(OrderApi);
  count = signal(0);
  doubled = computed(() => this.count() * 2);
  orders$ = this.api.orders$;

  constructor() {
    effect(() => {
      this.count.set(this.count() + 1);
    });
  }

  ngOnInit() {
    this.route.params.pipe(
      switchMap((p) => this.orderService.saveOrder(p)),
    ).subscribe();
  }
}
"#;

fn facts(src: &str) -> Vec<Fact> {
    let model = TypeScriptFrontend::new().parse(src);
    let unit = SourceUnit::new(
        Path::new("/repo/src/dashboard.component.ts"),
        Path::new("/repo"),
        src.to_string(),
        model,
    );
    FactExtractor::new().extract(&unit).expect("well-formed source")
}

fn of_kind(facts: &[Fact], kind: FactKind) -> Vec<&Fact> {
    facts.iter().filter(|f| f.kind == kind).collect()
}

#[test]
fn component_facts_are_extracted() {
    let facts = facts(DASHBOARD);

    let strategy = of_kind(&facts, FactKind::DetectionStrategy);
    assert_eq!(strategy.len(), 1);
    assert_eq!(strategy[0].text("strategy"), Some("Default"));

    let subscriptions = of_kind(&facts, FactKind::SubscriptionCreated);
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].get("disposed_inline"), Some(Value::Bool(false)));
    assert_eq!(subscriptions[0].text("source"), Some("route.params"));

    let flattened = of_kind(&facts, FactKind::FlattenedNetworkCall);
    assert_eq!(flattened.len(), 1);
    assert_eq!(flattened[0].text("operator"), Some("switchMap"));
    assert_eq!(flattened[0].get("mutating"), Some(Value::Bool(true)));

    let written = of_kind(&facts, FactKind::SignalWritten);
    assert_eq!(written.len(), 1);
    assert!(written[0].get("effect").is_some());

    let reads = of_kind(&facts, FactKind::SignalRead);
    assert!(reads.iter().any(|r| r.get("in_computed") == Some(Value::Bool(true))));
    assert!(reads.iter().any(|r| r.get("effect").is_some()));

    let pipes = of_kind(&facts, FactKind::PipeUsage);
    assert_eq!(pipes.len(), 1);
    assert_eq!(pipes[0].text("source"), Some("orders$"));

    assert_eq!(of_kind(&facts, FactKind::IterationWithoutKey).len(), 1);
    let calls: Vec<_> = of_kind(&facts, FactKind::TemplateCall)
        .iter()
        .filter_map(|f| f.text("callee"))
        .collect();
    assert_eq!(calls, vec!["format", "items"]);
}

#[test]
fn template_facts_point_into_the_file() {
    let facts = facts(DASHBOARD);
    let missing_key = of_kind(&facts, FactKind::IterationWithoutKey);
    let span = missing_key[0].span;
    assert_eq!(&DASHBOARD[span.offset..span.offset + 6], "*ngFor");
    assert_eq!(span.line, 8);
}

#[test]
fn extraction_is_deterministic() {
    assert_eq!(facts(DASHBOARD), facts(DASHBOARD));
}

#[test]
fn malformed_source_yields_no_facts() {
    let src = "@Component({ selector: 'x' })\nexport class Broken {\n  ngOnInit( {\n}\n";
    let model = TypeScriptFrontend::new().parse(src);
    assert!(model.is_malformed());
    let unit = SourceUnit::new(Path::new("b.ts"), Path::new(""), src.to_string(), model);
    assert!(FactExtractor::new().extract(&unit).is_err());
}

#[test]
fn handles_only_typescript_sources() {
    let ts = TypeScriptFrontend::new();
    assert!(ts.handles(Path::new("app.component.ts")));
    assert!(!ts.handles(Path::new("app.component.tsx")));
    assert!(!ts.handles(Path::new("env.d.ts")));
    assert!(TypeScriptFrontend::tsx().handles(Path::new("view.tsx")));
}
