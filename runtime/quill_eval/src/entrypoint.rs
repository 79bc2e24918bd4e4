//! Entry-point discovery.
//!
//! A lightweight single pass over a program's top-level object
//! definitions, used by script browsers to enumerate loadable
//! configurations without the cost of a full interpretation run. Advisory
//! by design: a program with nothing recognizable yields an empty listing,
//! never an error.

use quill_ir::{Name, NodeId, NodeKind, Program, StringInterner};

/// A discovered root definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    /// The object definition node, ready for
    /// `Interpreter::interpret_entry_point`.
    pub node: NodeId,
    /// The definition identifier.
    pub name: Name,
    /// Authored `name` property when it is a plain string literal,
    /// falling back to the identifier.
    pub display_name: String,
}

/// Scan top-level object definitions (non-recursive) for the configured
/// root type.
pub fn entry_points(
    program: &Program,
    interner: &StringInterner,
    root_type: &str,
) -> Vec<EntryPoint> {
    let root = interner.intern(root_type);
    let name_member = interner.intern("name");

    let mut found = Vec::new();
    for item in program.items() {
        let NodeKind::ObjectDef {
            type_name,
            name,
            properties,
        } = program.arena.kind(item)
        else {
            continue;
        };
        if type_name != root {
            continue;
        }

        let mut display_name = interner.lookup(name).to_owned();
        for &prop in program.arena.children(properties) {
            let NodeKind::PropertyDef {
                name: property,
                value,
            } = program.arena.kind(prop)
            else {
                continue;
            };
            if property == name_member {
                if let NodeKind::Str(s) = program.arena.kind(value) {
                    display_name = interner.lookup(s).to_owned();
                }
            }
        }

        found.push(EntryPoint {
            node: item,
            name,
            display_name,
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_ir::{NodeKind, Program, Span};

    #[test]
    fn empty_program_yields_empty_listing() {
        let program = Program::new();
        let interner = StringInterner::new();
        assert!(entry_points(&program, &interner, "quest_config").is_empty());
    }

    #[test]
    fn discovers_matching_definitions_with_display_name() {
        let interner = StringInterner::new();
        let mut program = Program::new();
        let quest_config = interner.intern("quest_config");
        let ident = interner.intern("level_one");
        let name_member = interner.intern("name");
        let display = interner.intern("The First Descent");

        let value = program.arena.push(NodeKind::Str(display), Span::ZERO);
        let prop = program.arena.push(
            NodeKind::PropertyDef {
                name: name_member,
                value,
            },
            Span::ZERO,
        );
        let properties = program.arena.push_list(&[prop]);
        let def = program.arena.push(
            NodeKind::ObjectDef {
                type_name: quest_config,
                name: ident,
                properties,
            },
            Span::ZERO,
        );
        program.items.push(def);

        // a non-matching definition is skipped
        let other_ty = interner.intern("settings");
        let other = program.arena.push(
            NodeKind::ObjectDef {
                type_name: other_ty,
                name: interner.intern("opts"),
                properties: quill_ir::NodeRange::EMPTY,
            },
            Span::ZERO,
        );
        program.items.push(other);

        let found = entry_points(&program, &interner, "quest_config");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, ident);
        assert_eq!(found[0].display_name, "The First Descent");
    }
}
