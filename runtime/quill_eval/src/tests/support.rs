//! Shared fixtures: host classes, script construction, interpreter
//! assembly.

use crate::graph::TaskGraph;
use crate::interpreter::{Interpreter, InterpreterBuilder};
use crate::natives::{NativeRegistry, PrintHandler};
use quill_ir::{Name, NodeId, NodeKind, NodeRange, Program, SharedInterner, Span};
use quill_types::{
    analyze, Capability, Environment, FunctionSig, HostCallback, HostClassBuilder, HostInstance,
    HostRead, HostScalar, HostWrite, TypeId, TypeKind,
};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

// Host classes

/// Minimal adapted class: a 2D position with two scalar fields.
#[derive(Debug, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

fn set_f64(target: &mut f64, scalar: &HostScalar) -> bool {
    match scalar {
        HostScalar::Float(f) => {
            *target = *f;
            true
        }
        HostScalar::Int(n) => {
            *target = *n as f64;
            true
        }
        _ => false,
    }
}

fn set_i64(target: &mut i64, scalar: &HostScalar) -> bool {
    match scalar {
        HostScalar::Int(n) => {
            *target = *n;
            true
        }
        _ => false,
    }
}

fn set_string(target: &mut String, scalar: &HostScalar) -> bool {
    match scalar {
        HostScalar::Str(s) => {
            *target = s.clone();
            true
        }
        _ => false,
    }
}

pub fn register_position(env: &mut Environment) -> TypeId {
    HostClassBuilder::<Position>::new("position")
        .constructor(|| Position { x: 0.0, y: 0.0 })
        .scalar_field(
            "x",
            TypeId::FLOAT,
            |p: &Position| HostScalar::Float(p.x),
            |p: &mut Position, s| set_f64(&mut p.x, s),
        )
        .scalar_field(
            "y",
            TypeId::FLOAT,
            |p: &Position| HostScalar::Float(p.y),
            |p: &mut Position, s| set_f64(&mut p.y, s),
        )
        .register(env)
}

/// Component class used by entity prototypes.
#[derive(Debug, Default, PartialEq)]
pub struct VelocityComponent {
    pub x_velocity: f64,
    pub y_velocity: f64,
}

pub fn register_velocity_component(env: &mut Environment) -> TypeId {
    HostClassBuilder::<VelocityComponent>::new("velocity_component")
        .constructor(VelocityComponent::default)
        .scalar_field(
            "xVelocity",
            TypeId::FLOAT,
            |c: &VelocityComponent| HostScalar::Float(c.x_velocity),
            |c: &mut VelocityComponent, s| set_f64(&mut c.x_velocity, s),
        )
        .scalar_field(
            "yVelocity",
            TypeId::FLOAT,
            |c: &VelocityComponent| HostScalar::Float(c.y_velocity),
            |c: &mut VelocityComponent, s| set_f64(&mut c.y_velocity, s),
        )
        .register(env)
}

/// Item base class; `item_type` definitions template its members.
#[derive(Debug, Default)]
pub struct QuestItem {
    pub name: String,
    pub value: i64,
}

pub fn register_quest_item(env: &mut Environment) -> TypeId {
    HostClassBuilder::<QuestItem>::new("quest_item")
        .constructor(QuestItem::default)
        .scalar_field(
            "name",
            TypeId::STRING,
            |i: &QuestItem| HostScalar::Str(i.name.clone()),
            |i: &mut QuestItem, s| set_string(&mut i.name, s),
        )
        .scalar_field(
            "value",
            TypeId::INT,
            |i: &QuestItem| HostScalar::Int(i.value),
            |i: &mut QuestItem, s| set_i64(&mut i.value, s),
        )
        .register(env)
}

/// The root configuration class.
#[derive(Debug, Default)]
pub struct QuestConfig {
    pub name: String,
    pub max_score: i64,
    pub dependency_graph: Option<Rc<TaskGraph>>,
    pub on_complete: Option<HostCallback>,
}

pub fn register_quest_config(env: &mut Environment) -> TypeId {
    let callback_ty = {
        let name = env.interner.intern("quest_callback");
        env.types.intern(
            name,
            TypeKind::Function(FunctionSig {
                params: Default::default(),
                ret: TypeId::NONE,
            }),
        )
    };
    HostClassBuilder::<QuestConfig>::new("quest_config")
        .constructor(QuestConfig::default)
        .scalar_field(
            "name",
            TypeId::STRING,
            |c: &QuestConfig| HostScalar::Str(c.name.clone()),
            |c: &mut QuestConfig, s| set_string(&mut c.name, s),
        )
        .scalar_field(
            "maxScore",
            TypeId::INT,
            |c: &QuestConfig| HostScalar::Int(c.max_score),
            |c: &mut QuestConfig, s| set_i64(&mut c.max_score, s),
        )
        .raw_field(
            "dependencyGraph",
            TypeId::GRAPH,
            |c: &QuestConfig| {
                Ok(match &c.dependency_graph {
                    Some(graph) => {
                        let any: Rc<dyn Any> = graph.clone();
                        HostRead::Opaque(any)
                    }
                    None => HostRead::Null,
                })
            },
            Some(Box::new(|c: &mut QuestConfig, w: &HostWrite| match w {
                HostWrite::Opaque(any) => match any.clone().downcast::<TaskGraph>() {
                    Ok(graph) => {
                        c.dependency_graph = Some(graph);
                        Ok(true)
                    }
                    Err(_) => Ok(false),
                },
                _ => Ok(false),
            })),
        )
        .callback_field(
            "onComplete",
            callback_ty,
            |c: &QuestConfig| c.on_complete.clone(),
            |c: &mut QuestConfig, cb| c.on_complete = Some(cb),
        )
        .register(env)
}

/// A class with a nested host object behind an aggregate-typed field.
#[derive(Debug)]
pub struct Spawn {
    pub position: Rc<RefCell<Position>>,
}

pub fn register_spawn(env: &mut Environment) -> TypeId {
    let position_ty = register_position(env);
    HostClassBuilder::<Spawn>::new("spawn")
        .object_field("position", position_ty, |s: &Spawn| {
            let nested: HostInstance = s.position.clone();
            Some(nested)
        })
        .register(env)
}

/// A class with capability-restricted properties.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    pub score: i64,
    pub secret: i64,
}

pub fn register_score_board(env: &mut Environment) -> TypeId {
    HostClassBuilder::<ScoreBoard>::new("score_board")
        .constructor(ScoreBoard::default)
        .property(
            "score",
            TypeId::INT,
            Capability::GET,
            Some(Box::new(|b: &ScoreBoard| {
                HostRead::Scalar(HostScalar::Int(b.score))
            })),
            Some(Box::new(|b: &mut ScoreBoard, w: &HostWrite| match w {
                HostWrite::Scalar(HostScalar::Int(n)) => {
                    b.score = *n;
                    true
                }
                _ => false,
            })),
        )
        .property(
            "secret",
            TypeId::INT,
            Capability::SET,
            Some(Box::new(|b: &ScoreBoard| {
                HostRead::Scalar(HostScalar::Int(b.secret))
            })),
            Some(Box::new(|b: &mut ScoreBoard, w: &HostWrite| match w {
                HostWrite::Scalar(HostScalar::Int(n)) => {
                    b.secret = *n;
                    true
                }
                _ => false,
            })),
        )
        .register(env)
}

// Script construction

/// Builds programs the way a front end would, one node at a time.
pub struct ScriptBuilder {
    pub interner: SharedInterner,
    pub program: Program,
}

impl ScriptBuilder {
    pub fn new(interner: SharedInterner) -> Self {
        ScriptBuilder {
            interner,
            program: Program::new(),
        }
    }

    pub fn name(&mut self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        self.program.arena.push(kind, Span::ZERO)
    }

    pub fn list(&mut self, children: &[NodeId]) -> NodeRange {
        self.program.arena.push_list(children)
    }

    pub fn int(&mut self, n: i64) -> NodeId {
        self.push(NodeKind::Int(n))
    }

    pub fn float(&mut self, f: f64) -> NodeId {
        self.push(NodeKind::Float(f))
    }

    pub fn str(&mut self, s: &str) -> NodeId {
        let name = self.name(s);
        self.push(NodeKind::Str(name))
    }

    pub fn ident(&mut self, s: &str) -> NodeId {
        let name = self.name(s);
        self.push(NodeKind::Ident(name))
    }

    pub fn prop(&mut self, name: &str, value: NodeId) -> NodeId {
        let name = self.name(name);
        self.push(NodeKind::PropertyDef { name, value })
    }

    pub fn component(&mut self, type_name: &str, props: &[NodeId]) -> NodeId {
        let type_name = self.name(type_name);
        let properties = self.list(props);
        self.push(NodeKind::ComponentDef {
            type_name,
            properties,
        })
    }

    pub fn object_def(&mut self, type_name: &str, name: &str, props: &[NodeId]) -> NodeId {
        let type_name = self.name(type_name);
        let name = self.name(name);
        let properties = self.list(props);
        let node = self.push(NodeKind::ObjectDef {
            type_name,
            name,
            properties,
        });
        self.program.items.push(node);
        node
    }

    pub fn prototype_def(&mut self, name: &str, components: &[NodeId]) -> NodeId {
        let name = self.name(name);
        let components = self.list(components);
        let node = self.push(NodeKind::PrototypeDef { name, components });
        self.program.items.push(node);
        node
    }

    pub fn item_def(&mut self, name: &str, props: &[NodeId]) -> NodeId {
        let name = self.name(name);
        let properties = self.list(props);
        let node = self.push(NodeKind::ItemPrototypeDef { name, properties });
        self.program.items.push(node);
        node
    }

    pub fn graph_def(&mut self, name: &str, edges: &[(&str, &str)]) -> NodeId {
        let name = self.name(name);
        let edge_ids: Vec<NodeId> = edges
            .iter()
            .map(|(from, to)| {
                let from = self.name(from);
                let to = self.name(to);
                self.push(NodeKind::EdgeStmt { from, to })
            })
            .collect();
        let edges = self.list(&edge_ids);
        let node = self.push(NodeKind::GraphDef { name, edges });
        self.program.items.push(node);
        node
    }

    pub fn param(&mut self, name: &str, type_name: &str) -> NodeId {
        let name = self.name(name);
        let type_name = self.name(type_name);
        self.push(NodeKind::ParamDef { name, type_name })
    }

    pub fn fn_def(
        &mut self,
        name: &str,
        params: &[NodeId],
        return_type: Option<&str>,
        body: &[NodeId],
    ) -> NodeId {
        let name = self.name(name);
        let params = self.list(params);
        let return_type = return_type.map(|r| self.interner.intern(r));
        let body = self.list(body);
        let node = self.push(NodeKind::FnDef {
            name,
            params,
            return_type,
            body,
        });
        self.program.items.push(node);
        node
    }

    pub fn call(&mut self, name: &str, args: &[NodeId]) -> NodeId {
        let name = self.name(name);
        let args = self.list(args);
        self.push(NodeKind::FnCall { name, args })
    }

    pub fn member(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::MemberAccess { lhs, rhs })
    }
}

// Interpreter assembly

/// Build an interpreter over a constructed script, with captured print
/// output.
pub fn build_interpreter(
    setup: impl FnOnce(&mut Environment),
    script: impl FnOnce(&mut ScriptBuilder),
) -> (Interpreter, Rc<RefCell<String>>) {
    let interner = SharedInterner::new();
    let mut env = Environment::new(interner.clone());
    let natives = NativeRegistry::standard(&mut env);
    setup(&mut env);

    let mut builder = ScriptBuilder::new(interner);
    script(&mut builder);

    let analysis = analyze(&mut env, &builder.program);
    assert!(
        analysis.diagnostics.is_empty(),
        "unexpected analysis diagnostics: {:?}",
        analysis.diagnostics
    );

    let (print, output) = PrintHandler::buffer();
    let interp = InterpreterBuilder::new(env, analysis.table, builder.program)
        .natives(natives)
        .print_handler(print)
        .build();
    (interp, output)
}
