//! Evaluator (spec.md §4.7): walks the concatenated syntax trees produced by
//! the Parser, maintaining a variable environment with overlays for
//! conditional branches, expanding text, evaluating conditionals, inferring
//! compile invocations, and partitioning project-global configuration.

pub mod compile;
pub mod environment;
pub mod expand;
pub mod functions;
pub mod project_globals;

use std::sync::Arc;

use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::fs::FilesystemBoundary;
use crate::location::SourceLocation;
use crate::parser::types::{AssignOp, ConditionalKind, Node, Rule};
use crate::parser::types::SyntaxTree;
use crate::unknown::{Category, Context, Impact, NewUnknownConstruct, Phase, UnknownConstructRegistry};

use compile::InferredCompile;
use environment::Environment;
use project_globals::ProjectGlobals;

pub struct EvalContext<'a> {
    pub filesystem: &'a dyn FilesystemBoundary,
    pub sink: &'a mut DiagnosticSink,
    pub unknown: &'a mut UnknownConstructRegistry,
    pub ignore_paths: &'a [String],
}

#[derive(Debug, Clone)]
pub struct EvaluatedRule {
    pub targets: Vec<String>,
    pub prerequisites: Vec<String>,
    pub order_only_prerequisites: Vec<String>,
    pub recipe: Vec<String>,
    pub is_pattern: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct CustomCommand {
    pub output: String,
    pub inputs: Vec<String>,
    pub recipe: Vec<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Default)]
pub struct BuildFacts {
    pub evaluated_rules: Vec<EvaluatedRule>,
    pub pattern_rules: Vec<EvaluatedRule>,
    pub inferred_compiles: Vec<InferredCompile>,
    pub custom_commands: Vec<CustomCommand>,
    pub project_globals: ProjectGlobals,
}

struct EvalState {
    env: Environment,
    seen_rule: bool,
    facts: BuildFacts,
}

pub fn evaluate(trees: &[SyntaxTree], config: &Config, ctx: &mut EvalContext) -> BuildFacts {
    let mut state = EvalState {
        env: Environment::new(),
        seen_rule: false,
        facts: BuildFacts::default(),
    };
    for tree in trees {
        let is_global_file = config
            .global_config_files
            .contains(&crate::fs::basename(std::path::Path::new(tree.path.as_ref())));
        process_nodes(&tree.nodes, &tree.path, is_global_file, config, &mut state, ctx);
    }
    state.facts
}

fn process_nodes(
    nodes: &[Node],
    file_path: &Arc<str>,
    is_global_file: bool,
    config: &Config,
    state: &mut EvalState,
    ctx: &mut EvalContext,
) {
    for node in nodes {
        match node {
            Node::VariableAssign(a) => handle_assignment(a, file_path, is_global_file, state, ctx),
            Node::Rule(r) => handle_rule(r, state, ctx),
            Node::Include(_) => {}
            Node::Conditional(c) => {
                let branch = c.branches.iter().find(|b| condition_holds(b, state, ctx));
                match branch {
                    Some(b) => {
                        // GNU Make does not scope assignments to the
                        // conditional block: a var set inside a taken branch
                        // must still be visible after `endif`, so bind
                        // straight into the enclosing frame rather than a
                        // short-lived overlay.
                        process_nodes(&b.body, file_path, is_global_file, config, state, ctx);
                    }
                    None => {
                        ctx.unknown.record(
                            NewUnknownConstruct {
                                category: Category::ConditionalLogic,
                                location: c.location.clone(),
                                raw_snippet: crate::unknown::trim_snippet(
                                    &c.branches
                                        .first()
                                        .and_then(|b| b.raw_condition.clone())
                                        .unwrap_or_default(),
                                ),
                                normalized_form: String::new(),
                                context: Context::default(),
                                impact: Impact {
                                    phase: Phase::Evaluate,
                                    severity: crate::diagnostics::Severity::Warn,
                                },
                                cmake_status: crate::unknown::CMakeStatus::NotGenerated,
                                suggested_action: crate::unknown::SuggestedAction::ManualReview,
                            },
                            ctx.sink,
                        );
                    }
                }
            }
            Node::Unknown(u) => {
                ctx.unknown.record(
                    NewUnknownConstruct {
                        category: Category::MakeSyntax,
                        location: u.location.clone(),
                        raw_snippet: u.raw.clone(),
                        normalized_form: u.raw.clone(),
                        context: Context::default(),
                        impact: Impact {
                            phase: Phase::Parse,
                            severity: crate::diagnostics::Severity::Warn,
                        },
                        cmake_status: crate::unknown::CMakeStatus::NotGenerated,
                        suggested_action: crate::unknown::SuggestedAction::ManualReview,
                    },
                    ctx.sink,
                );
            }
        }
    }
}

fn handle_assignment(
    a: &crate::parser::types::VariableAssign,
    file_path: &Arc<str>,
    is_global_file: bool,
    state: &mut EvalState,
    ctx: &mut EvalContext,
) {
    let snapshot = match a.op {
        AssignOp::Simple => {
            let v = expand::expand(&a.value, &a.location, &state.env, ctx);
            state.env.bind_simple(&a.name, v.clone());
            v
        }
        AssignOp::Recursive => {
            state.env.bind_recursive(&a.name, a.value.clone());
            expand::expand(&a.value, &a.location, &state.env, ctx)
        }
        AssignOp::Conditional => {
            let already_set = state.env.get(&a.name).is_some();
            state.env.bind_if_unset(&a.name, a.value.clone());
            if already_set {
                state
                    .env
                    .get(&a.name)
                    .map(|v| v.value.clone())
                    .unwrap_or_default()
            } else {
                expand::expand(&a.value, &a.location, &state.env, ctx)
            }
        }
        AssignOp::Append => {
            let expanded_new = expand::expand(&a.value, &a.location, &state.env, ctx);
            state.env.append(&a.name, expanded_new, a.value.clone());
            state
                .env
                .get(&a.name)
                .map(|v| v.value.clone())
                .unwrap_or_default()
        }
    };

    let is_global = is_global_file || !state.seen_rule;
    if is_global {
        state.facts.project_globals.record(&a.name, &snapshot, file_path.clone());
    }
}

fn handle_rule(r: &Rule, state: &mut EvalState, ctx: &mut EvalContext) {
    state.seen_rule = true;

    let expanded_targets = expand_word_list(&r.targets.join(" "), &r.location, state, ctx);
    let expanded_prereqs = expand_word_list(&r.prerequisites.join(" "), &r.location, state, ctx);
    let expanded_order_only = expand_word_list(&r.order_only_prerequisites.join(" "), &r.location, state, ctx);

    if r.is_pattern {
        let recipe: Vec<String> = r
            .recipe
            .iter()
            .map(|rl| expand::expand(&rl.text, &rl.location, &state.env, ctx))
            .collect();
        state.facts.pattern_rules.push(EvaluatedRule {
            targets: expanded_targets,
            prerequisites: expanded_prereqs,
            order_only_prerequisites: expanded_order_only,
            recipe,
            is_pattern: true,
            location: r.location.clone(),
        });
        return;
    }

    let deduped_prereqs = dedup_preserve_order(&expanded_prereqs);
    let mut recipe_texts = Vec::with_capacity(r.recipe.len());
    for rl in &r.recipe {
        state.env.push_overlay();
        state
            .env
            .bind_automatic("@", expanded_targets.first().cloned().unwrap_or_default());
        state
            .env
            .bind_automatic("<", expanded_prereqs.first().cloned().unwrap_or_default());
        state.env.bind_automatic("^", deduped_prereqs.join(" "));
        state.env.bind_automatic("?", deduped_prereqs.join(" "));
        state.env.bind_automatic("*", String::new());
        recipe_texts.push(expand::expand(&rl.text, &rl.location, &state.env, ctx));
        state.env.pop_overlay();
    }

    state.facts.evaluated_rules.push(EvaluatedRule {
        targets: expanded_targets.clone(),
        prerequisites: expanded_prereqs.clone(),
        order_only_prerequisites: expanded_order_only,
        recipe: recipe_texts.clone(),
        is_pattern: false,
        location: r.location.clone(),
    });

    let fallback_output = expanded_targets.first().cloned();
    let mut any_recognized = false;
    for (line, rl) in recipe_texts.iter().zip(r.recipe.iter()) {
        let compiles =
            compile::infer_recipe_line(line, fallback_output.as_deref(), &rl.location, ctx.sink);
        if !compiles.is_empty() {
            any_recognized = true;
            state.facts.inferred_compiles.extend(compiles);
        }
    }
    if !any_recognized && !recipe_texts.is_empty() {
        state.facts.custom_commands.push(CustomCommand {
            output: fallback_output.unwrap_or_default(),
            inputs: expanded_prereqs,
            recipe: recipe_texts,
            location: r.location.clone(),
        });
    }
}

fn expand_word_list(joined: &str, location: &SourceLocation, state: &EvalState, ctx: &mut EvalContext) -> Vec<String> {
    if joined.trim().is_empty() {
        return Vec::new();
    }
    expand::expand(joined, location, &state.env, ctx)
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

fn dedup_preserve_order(items: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert((*item).clone()))
        .cloned()
        .collect()
}

fn condition_holds(
    branch: &crate::parser::types::ConditionalBranch,
    state: &mut EvalState,
    ctx: &mut EvalContext,
) -> bool {
    match branch.kind {
        None => true,
        Some(ConditionalKind::IfDef) | Some(ConditionalKind::IfNdef) => {
            let raw = branch.raw_condition.clone().unwrap_or_default();
            let name = expand::expand(&raw, &branch.location, &state.env, ctx);
            let defined = state.env.is_defined_non_empty(name.trim());
            if branch.kind == Some(ConditionalKind::IfNdef) {
                !defined
            } else {
                defined
            }
        }
        Some(ConditionalKind::IfEq) | Some(ConditionalKind::IfNeq) => {
            let raw = branch.raw_condition.clone().unwrap_or_default();
            match parse_two_args(&raw) {
                Some((lhs, rhs)) => {
                    let a = expand::expand(&lhs, &branch.location, &state.env, ctx);
                    let b = expand::expand(&rhs, &branch.location, &state.env, ctx);
                    let equal = a.trim() == b.trim();
                    if branch.kind == Some(ConditionalKind::IfNeq) {
                        !equal
                    } else {
                        equal
                    }
                }
                None => false,
            }
        }
    }
}

fn parse_two_args(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    let inner = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        return None;
    };
    let parts = expand::split_top_level_commas(inner);
    if parts.len() != 2 {
        return None;
    }
    Some((parts[0].trim().to_string(), parts[1].trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFilesystem;

    fn trees_from(path: &str, content: &str) -> SyntaxTree {
        let mut sink = DiagnosticSink::new();
        crate::parser::parse(Arc::from(path), content, &mut sink)
    }

    #[test]
    fn single_executable_single_makefile_scenario() {
        let tree = trees_from(
            "Makefile",
            "app: main.o\n\tgcc -o app main.o\n\nmain.o: main.c\n\tgcc -c main.c -o main.o\n",
        );
        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let mut ctx = EvalContext {
            filesystem: &memfs,
            sink: &mut sink,
            unknown: &mut unknown,
            ignore_paths: &[],
        };
        let facts = evaluate(&[tree], &config, &mut ctx);
        assert_eq!(facts.inferred_compiles.len(), 2);
        assert!(!sink.any_error());
    }

    #[test]
    fn project_global_before_first_rule_is_captured() {
        let tree = trees_from("Makefile", "CFLAGS := -O2\napp: main.c\n\tgcc -c main.c -o app\n");
        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let mut ctx = EvalContext {
            filesystem: &memfs,
            sink: &mut sink,
            unknown: &mut unknown,
            ignore_paths: &[],
        };
        let facts = evaluate(&[tree], &config, &mut ctx);
        assert_eq!(facts.project_globals.c_flags, vec!["-O2"]);
    }

    #[test]
    fn ifeq_conditional_selects_matching_branch() {
        let tree = trees_from(
            "Makefile",
            "DEBUG := 1\nifeq ($(DEBUG),1)\nCFLAGS := -g\nelse\nCFLAGS := -O2\nendif\n",
        );
        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let mut ctx = EvalContext {
            filesystem: &memfs,
            sink: &mut sink,
            unknown: &mut unknown,
            ignore_paths: &[],
        };
        let facts = evaluate(&[tree], &config, &mut ctx);
        assert_eq!(facts.project_globals.c_flags, vec!["-g"]);
    }

    #[test]
    fn variable_bound_inside_taken_conditional_branch_survives_past_endif() {
        let tree = trees_from(
            "Makefile",
            "DEBUG := 1\nifeq ($(DEBUG),1)\nCFLAGS := -g\nendif\napp: main.c\n\tgcc -c main.c $(CFLAGS) -o app\n",
        );
        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let mut ctx = EvalContext {
            filesystem: &memfs,
            sink: &mut sink,
            unknown: &mut unknown,
            ignore_paths: &[],
        };
        let facts = evaluate(&[tree], &config, &mut ctx);
        let recipe = &facts.evaluated_rules[0].recipe[0];
        assert!(recipe.contains("-g"), "CFLAGS set inside the taken branch should survive past endif: {recipe}");
    }

    #[test]
    fn unknown_function_call_is_registered() {
        let tree = trees_from(
            "Makefile",
            "app: main.c\n\t$(eval $(call DEFINE_RULE,foo))\n\tgcc -c main.c -o app\n",
        );
        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let mut ctx = EvalContext {
            filesystem: &memfs,
            sink: &mut sink,
            unknown: &mut unknown,
            ignore_paths: &[],
        };
        let facts = evaluate(&[tree], &config, &mut ctx);
        assert!(unknown.by_category(Category::MakeFunction).count() >= 1);
        assert!(!facts.inferred_compiles.is_empty());
    }
}
