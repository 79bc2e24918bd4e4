//! Interpreter scenarios: quest configs end to end, functions, loops,
//! assignment semantics, determinism.

use super::support::{
    build_interpreter, register_position, register_quest_config, register_velocity_component,
    QuestConfig, ScriptBuilder,
};
use crate::interpreter::{Interpreter, InterpreterBuilder, RootConfig};
use crate::natives::{NativeRegistry, PrintHandler};
use crate::value::{RawValue, Value};
use pretty_assertions::assert_eq;
use quill_ir::{BinaryOp, NodeKind, SharedInterner};
use quill_types::{analyze, Environment};

fn quest_script(s: &mut ScriptBuilder) {
    s.graph_def("task_deps", &[("find_key", "open_door")]);
    let score = s.int(100);
    let score_prop = s.prop("max_score", score);
    let graph_ref = s.ident("task_deps");
    let graph_prop = s.prop("dependency_graph", graph_ref);
    s.object_def("quest_config", "my_quest", &[score_prop, graph_prop]);
}

fn interpret_quest(script: impl FnOnce(&mut ScriptBuilder)) -> (Interpreter, RootConfig) {
    let (mut interp, _) = build_interpreter(
        |env| {
            register_quest_config(env);
        },
        script,
    );
    let config = interp
        .interpret_first_root()
        .expect("interpretation")
        .expect("a root definition");
    (interp, config)
}

#[test]
fn quest_config_binds_to_the_host_object() {
    let (_, config) = interpret_quest(quest_script);

    let host = config.host.expect("host instance");
    let borrowed = host.borrow();
    let quest = borrowed.downcast_ref::<QuestConfig>().expect("downcast");

    assert_eq!(quest.max_score, 100);
    // the unset `name` member picks up the definition identifier
    assert_eq!(quest.name, "my_quest");
    assert_eq!(config.display_name, "my_quest");

    let graph = quest.dependency_graph.as_ref().expect("dependency graph");
    assert_eq!(graph.nodes().len(), 2);
    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn authored_display_name_wins_over_identifier() {
    let (_, config) = interpret_quest(|s| {
        let title = s.str("The Long Dark");
        let name_prop = s.prop("name", title);
        s.object_def("quest_config", "my_quest", &[name_prop]);
    });

    assert_eq!(config.display_name, "The Long Dark");
    let host = config.host.expect("host instance");
    let borrowed = host.borrow();
    let quest = borrowed.downcast_ref::<QuestConfig>().expect("downcast");
    assert_eq!(quest.name, "The Long Dark");
}

#[test]
fn evaluated_members_read_back_through_the_host_binding() {
    let (interp, config) = interpret_quest(quest_script);

    // after conversion the definition's backing store is the live object
    let Value::Aggregate(slot) = &config.value else {
        panic!("expected aggregate config value");
    };
    let space = slot.borrow().space.clone();
    let member = space
        .resolve_local(interp.interner().intern("max_score"))
        .expect("member resolution");
    assert_eq!(interp.raw_of(&member).expect("read"), RawValue::Int(100));
}

#[test]
fn interpretation_is_deterministic() {
    let (_, first) = interpret_quest(quest_script);
    let (_, second) = interpret_quest(quest_script);

    let (first, second) = (first.host.expect("host"), second.host.expect("host"));
    let (first, second) = (first.borrow(), second.borrow());
    let first = first.downcast_ref::<QuestConfig>().expect("downcast");
    let second = second.downcast_ref::<QuestConfig>().expect("downcast");

    assert_eq!(first.max_score, second.max_score);
    assert_eq!(first.name, second.name);
    let (g1, g2) = (
        first.dependency_graph.as_ref().expect("graph"),
        second.dependency_graph.as_ref().expect("graph"),
    );
    assert_eq!(g1.nodes(), g2.nodes());
    assert_eq!(g1.edges(), g2.edges());
}

#[test]
fn missing_root_definition_yields_none() {
    let (mut interp, _) = build_interpreter(
        |env| {
            register_quest_config(env);
        },
        |s| {
            s.graph_def("orphan", &[("a", "b")]);
        },
    );
    assert!(interp.interpret_first_root().expect("interpretation").is_none());
}

#[test]
fn unknown_identifier_resolves_to_sentinel_without_aborting() {
    let (_, config) = interpret_quest(|s| {
        let unknown = s.ident("does_not_exist");
        let prop = s.prop("max_score", unknown);
        s.object_def("quest_config", "my_quest", &[prop]);
    });
    let host = config.host.expect("host instance");
    let borrowed = host.borrow();
    let quest = borrowed.downcast_ref::<QuestConfig>().expect("downcast");
    // the assignment was rejected, the member kept its default
    assert_eq!(quest.max_score, 0);
}

fn call_named(interp: &mut Interpreter, name: &str) {
    let symbol = {
        let name = interp.interner().intern(name);
        interp.runtime_env().sem.resolve_global(name)
    };
    let result = interp.call_function(symbol, &[]).expect("call");
    assert!(result.is_none(), "user-defined calls yield the sentinel");
}

#[test]
fn for_loop_iterates_with_counter_and_prints() {
    let (mut interp, output) = build_interpreter(
        |_| {},
        |s| {
            let one = s.int(1);
            let two = s.int(2);
            let three = s.int(3);
            let entries = s.list(&[one, two, three]);
            let iterable = s.push(NodeKind::ListLit { entries });
            let x_ref = s.ident("x");
            let print_x = s.call("print", &[x_ref]);
            let var = s.name("x");
            let counter = s.name("i");
            let for_node = s.push(NodeKind::For {
                var,
                iterable,
                counter: Some(counter),
                body: print_x,
            });
            s.fn_def("count_up", &[], None, &[for_node]);
        },
    );
    interp.initialize().expect("initialization");
    call_named(&mut interp, "count_up");
    assert_eq!(*output.borrow(), "1\n2\n3\n");
}

#[test]
fn while_loop_mutates_through_the_function_space() {
    let (mut interp, output) = build_interpreter(
        |_| {},
        |s| {
            let zero = s.int(0);
            let n = s.name("n");
            let decl = s.push(NodeKind::VarDecl {
                name: n,
                ty: None,
                init: Some(zero),
            });

            let n_ref = s.ident("n");
            let three = s.int(3);
            let condition = s.push(NodeKind::Binary {
                op: BinaryOp::Lt,
                lhs: n_ref,
                rhs: three,
            });

            let n_print = s.ident("n");
            let print_n = s.call("print", &[n_print]);
            let n_lhs = s.ident("n");
            let n_rhs = s.ident("n");
            let one = s.int(1);
            let plus = s.push(NodeKind::Binary {
                op: BinaryOp::Add,
                lhs: n_rhs,
                rhs: one,
            });
            let assign = s.push(NodeKind::Assignment {
                lhs: n_lhs,
                rhs: plus,
            });
            let stmts = s.list(&[print_n, assign]);
            let body = s.push(NodeKind::Block { stmts });
            let while_node = s.push(NodeKind::While { condition, body });

            s.fn_def("climb", &[], None, &[decl, while_node]);
        },
    );
    interp.initialize().expect("initialization");
    call_named(&mut interp, "climb");
    assert_eq!(*output.borrow(), "0\n1\n2\n");
}

#[test]
fn return_short_circuits_the_body_and_the_result_is_discarded() {
    let (mut interp, output) = build_interpreter(
        |_| {},
        |s| {
            let before = s.str("before");
            let print_before = s.call("print", &[before]);
            let forty_two = s.int(42);
            let ret = s.push(NodeKind::Return {
                value: Some(forty_two),
            });
            let after = s.str("after");
            let print_after = s.call("print", &[after]);
            s.fn_def(
                "answer",
                &[],
                Some("int"),
                &[print_before, ret, print_after],
            );
        },
    );
    interp.initialize().expect("initialization");
    call_named(&mut interp, "answer");
    assert_eq!(*output.borrow(), "before\n");
}

#[test]
fn user_call_result_does_not_populate_a_property() {
    let (_, config) = interpret_quest(|s| {
        let forty_two = s.int(42);
        let ret = s.push(NodeKind::Return {
            value: Some(forty_two),
        });
        s.fn_def("answer", &[], Some("int"), &[ret]);

        let call = s.call("answer", &[]);
        let prop = s.prop("max_score", call);
        s.object_def("quest_config", "my_quest", &[prop]);
    });
    let host = config.host.expect("host instance");
    let borrowed = host.borrow();
    let quest = borrowed.downcast_ref::<QuestConfig>().expect("downcast");
    // the original discards user-defined return values; preserved
    assert_eq!(quest.max_score, 0);
}

#[test]
fn short_circuit_skips_the_poisoned_operand() {
    let (mut interp, output) = build_interpreter(
        |_| {},
        |s| {
            // `true or (1 / 0)` must not evaluate the division
            let lhs = s.push(NodeKind::Bool(true));
            let one = s.int(1);
            let zero = s.int(0);
            let division = s.push(NodeKind::Binary {
                op: BinaryOp::Div,
                lhs: one,
                rhs: zero,
            });
            let or = s.push(NodeKind::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs: division,
            });
            let ok = s.str("ok");
            let print_ok = s.call("print", &[ok]);
            let if_node = s.push(NodeKind::If {
                condition: or,
                then_branch: print_ok,
                else_branch: None,
            });
            s.fn_def("check", &[], None, &[if_node]);
        },
    );
    interp.initialize().expect("initialization");
    call_named(&mut interp, "check");
    assert_eq!(*output.borrow(), "ok\n");
}

#[test]
fn instantiate_native_builds_independent_entities() {
    let (mut interp, output) = build_interpreter(
        |env| {
            register_velocity_component(env);
        },
        |s| {
            let speed = s.float(5.0);
            let x_prop = s.prop("x_velocity", speed);
            let component = s.component("velocity_component", &[x_prop]);
            s.prototype_def("knight", &[component]);

            let knight_ref = s.ident("knight");
            let call = s.call("instantiate", &[knight_ref]);
            let k = s.name("k");
            let decl = s.push(NodeKind::VarDecl {
                name: k,
                ty: None,
                init: Some(call),
            });
            let k_ref = s.ident("k");
            let comp_ref = s.ident("velocity_component");
            let x_ref = s.ident("x_velocity");
            let inner = s.member(comp_ref, x_ref);
            let access = s.member(k_ref, inner);
            let print_x = s.call("print", &[access]);
            s.fn_def("spawn", &[], None, &[decl, print_x]);
        },
    );
    interp.initialize().expect("initialization");
    call_named(&mut interp, "spawn");
    assert_eq!(*output.borrow(), "5\n");
}

#[test]
fn aggregate_assignment_aliases_in_compat_mode() {
    let (mut interp, _) = build_interpreter(
        |env| {
            register_position(env);
        },
        |_| {},
    );
    interp.initialize().expect("initialization");
    let ty = {
        let name = interp.interner().intern("position");
        interp.runtime_env().types().resolve(name)
    };

    let a = interp.create_default_value(ty).expect("default");
    let b = interp.create_default_value(ty).expect("default");

    let x = interp.interner().intern("x");
    let b_x = member(&b, x);
    interp.set_value(&b_x, &Value::float(1.5)).expect("set");

    // compat: the assignee's space is replaced by the source's (aliasing)
    assert!(interp.set_value(&a, &b).expect("assign"));
    assert_eq!(interp.raw_of(&member(&a, x)).expect("read"), RawValue::Float(1.5));

    // later mutation through the source is observable through the alias
    interp.set_value(&b_x, &Value::float(9.0)).expect("set");
    assert_eq!(interp.raw_of(&member(&a, x)).expect("read"), RawValue::Float(9.0));
}

#[test]
fn aggregate_assignment_copies_with_compat_off() {
    let interner = SharedInterner::new();
    let mut env = Environment::new(interner.clone());
    let natives = NativeRegistry::standard(&mut env);
    register_position(&mut env);
    let builder = ScriptBuilder::new(interner);
    let analysis = analyze(&mut env, &builder.program);

    let mut interp = InterpreterBuilder::new(env, analysis.table, builder.program)
        .natives(natives)
        .assign_compat(false)
        .print_handler(PrintHandler::Silent)
        .build();
    interp.initialize().expect("initialization");

    let ty = {
        let name = interp.interner().intern("position");
        interp.runtime_env().types().resolve(name)
    };
    let a = interp.create_default_value(ty).expect("default");
    let b = interp.create_default_value(ty).expect("default");
    let x = interp.interner().intern("x");
    let b_x = member(&b, x);
    interp.set_value(&b_x, &Value::float(1.5)).expect("set");

    assert!(interp.set_value(&a, &b).expect("assign"));
    assert_eq!(interp.raw_of(&member(&a, x)).expect("read"), RawValue::Float(1.5));

    // pure value semantics: later source mutation is invisible
    interp.set_value(&b_x, &Value::float(9.0)).expect("set");
    assert_eq!(interp.raw_of(&member(&a, x)).expect("read"), RawValue::Float(1.5));
}

fn member(value: &Value, name: quill_ir::Name) -> Value {
    let Value::Aggregate(slot) = value else {
        panic!("expected aggregate");
    };
    let space = slot.borrow().space.clone();
    space.resolve_local(name).expect("member resolution")
}

#[test]
fn script_callbacks_round_trip_through_host_fields() {
    let (mut interp, output) = build_interpreter(
        |env| {
            register_quest_config(env);
        },
        |s| {
            let done = s.str("quest complete");
            let print_done = s.call("print", &[done]);
            s.fn_def("celebrate", &[], None, &[print_done]);

            let celebrate_ref = s.ident("celebrate");
            let prop = s.prop("on_complete", celebrate_ref);
            s.object_def("quest_config", "my_quest", &[prop]);
        },
    );
    let config = interp
        .interpret_first_root()
        .expect("interpretation")
        .expect("a root definition");

    // the DSL function landed in the host field as a script callback
    let callback = {
        let host = config.host.expect("host instance");
        let borrowed = host.borrow();
        let quest = borrowed.downcast_ref::<QuestConfig>().expect("downcast");
        quest.on_complete.clone().expect("callback")
    };
    let quill_types::HostCallback::Script(symbol) = callback else {
        panic!("expected a script callback");
    };

    // the embedder invokes it back through the interpreter
    let result = interp.call_function(symbol, &[]).expect("callback call");
    assert!(result.is_none());
    assert_eq!(*output.borrow(), "quest complete\n");
}

#[test]
fn enum_variants_resolve_through_member_access() {
    let (mut interp, output) = build_interpreter(
        |env| {
            env.register_enum("task_state", &["OPEN", "DONE", "FAILED"]);
        },
        |s| {
            let ty_ref = s.ident("task_state");
            let variant_ref = s.ident("DONE");
            let access = s.member(ty_ref, variant_ref);
            let state = s.name("state");
            let decl = s.push(NodeKind::VarDecl {
                name: state,
                ty: None,
                init: Some(access),
            });
            let state_ref = s.ident("state");
            let print_state = s.call("print", &[state_ref]);

            let bogus_ref = s.ident("task_state");
            let missing_ref = s.ident("MISSING");
            let missing = s.member(bogus_ref, missing_ref);
            let fallback = s.name("fallback");
            let decl_missing = s.push(NodeKind::VarDecl {
                name: fallback,
                ty: None,
                init: Some(missing),
            });
            let fallback_ref = s.ident("fallback");
            let print_fallback = s.call("print", &[fallback_ref]);

            s.fn_def(
                "inspect",
                &[],
                None,
                &[decl, print_state, decl_missing, print_fallback],
            );
        },
    );
    interp.initialize().expect("initialization");
    call_named(&mut interp, "inspect");
    // unknown variants resolve to the sentinel, not an error
    assert_eq!(*output.borrow(), "DONE\nnone\n");
}

#[test]
fn var_redeclaration_replaces_the_prior_binding() {
    let (mut interp, output) = build_interpreter(
        |_| {},
        |s| {
            let one = s.int(1);
            let x = s.name("x");
            let first = s.push(NodeKind::VarDecl {
                name: x,
                ty: None,
                init: Some(one),
            });
            let x_ref = s.ident("x");
            let print_first = s.call("print", &[x_ref]);

            let two = s.str("two");
            let second = s.push(NodeKind::VarDecl {
                name: x,
                ty: None,
                init: Some(two),
            });
            let x_ref2 = s.ident("x");
            let print_second = s.call("print", &[x_ref2]);

            s.fn_def("shadow", &[], None, &[first, print_first, second, print_second]);
        },
    );
    interp.initialize().expect("initialization");
    call_named(&mut interp, "shadow");
    assert_eq!(*output.borrow(), "1\ntwo\n");
}
