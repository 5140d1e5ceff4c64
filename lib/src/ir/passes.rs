//! Rewrites over the IR of a method
//!
//! Passes take a method body and produce a new one. Every reference in the output still points
//! at the same logical instruction (or, when that instruction is removed, the one that now
//! takes its place).

use crate::ir::{Handler, InsnRef, MethodBody};
use crate::tiny::Opcode;

/// Drop `nop` instructions
///
/// A reference to a removed `nop` moves to the next surviving instruction. A `nop` with no
/// surviving instruction after it is only kept if something refers to it. Handlers whose range
/// becomes empty are dropped.
pub fn eliminate_nops(body: &MethodBody) -> MethodBody {
    let len = body.instructions.len();

    let mut referenced = vec![false; len];
    for instruction in &body.instructions {
        for InsnRef(target) in instruction.targets() {
            if let Some(flag) = referenced.get_mut(target) {
                *flag = true;
            }
        }
    }
    for handler in &body.handlers {
        for InsnRef(target) in [handler.start, handler.handler] {
            if let Some(flag) = referenced.get_mut(target) {
                *flag = true;
            }
        }
    }

    // Decide from the back, so we know whether anything survives after each `nop`
    let mut keep = vec![false; len];
    let mut survivor_after = false;
    for position in (0..len).rev() {
        let is_nop = body.instructions[position].opcode == Opcode::Nop;
        keep[position] = !is_nop || (!survivor_after && referenced[position]);
        survivor_after |= keep[position];
    }

    // `remap[i]` is the new position of the first surviving instruction at or after `i`
    let mut remap = vec![0; len + 1];
    let mut next_position = keep.iter().filter(|kept| **kept).count();
    remap[len] = next_position;
    for position in (0..len).rev() {
        if keep[position] {
            next_position -= 1;
        }
        remap[position] = next_position;
    }
    let remap_ref = |InsnRef(target): InsnRef| InsnRef(remap[target.min(len)]);

    let instructions = body
        .instructions
        .iter()
        .zip(&keep)
        .filter(|(_, kept)| **kept)
        .map(|(instruction, _)| instruction.map_targets(remap_ref))
        .collect();

    let handlers = body
        .handlers
        .iter()
        .map(|handler| Handler {
            start: remap_ref(handler.start),
            end: remap_ref(handler.end),
            handler: remap_ref(handler.handler),
            catch_type: handler.catch_type,
        })
        .filter(|handler| handler.start < handler.end)
        .collect();

    let result = MethodBody {
        instructions,
        handlers,
        max_stack: body.max_stack,
        max_locals: body.max_locals,
    };
    log::trace!(
        "eliminated {} nops",
        body.instructions.len() - result.instructions.len()
    );
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::{Disp, Instruction, Reg, Shape};

    fn nop() -> Instruction {
        Instruction::new(Opcode::Nop, 1, Shape::Bare)
    }

    fn ret() -> Instruction {
        Instruction::new(Opcode::Ret, 1, Shape::Bare)
    }

    fn goto(target: usize) -> Instruction {
        Instruction::new(
            Opcode::Goto,
            1,
            Shape::RegDisp {
                reg: Reg::PC,
                disp: Disp::Branch(InsnRef(target)),
            },
        )
    }

    fn body(instructions: Vec<Instruction>) -> MethodBody {
        MethodBody {
            instructions,
            ..MethodBody::default()
        }
    }

    #[test]
    fn references_move_to_next_survivor() {
        // 0: goto @2, 1: nop, 2: nop, 3: ret, 4: goto @1
        let input = body(vec![goto(2), nop(), nop(), ret(), goto(1)]);
        let output = eliminate_nops(&input);
        assert_eq!(output.instructions, vec![goto(1), ret(), goto(1)]);
        assert!(output.validate().is_ok());
    }

    #[test]
    fn referenced_trailing_nop_is_kept() {
        let input = body(vec![goto(3), ret(), nop(), nop()]);
        let output = eliminate_nops(&input);
        assert_eq!(output.instructions, vec![goto(2), ret(), nop()]);
        assert!(output.validate().is_ok());

        let unreferenced = body(vec![ret(), nop(), nop()]);
        assert_eq!(eliminate_nops(&unreferenced).instructions, vec![ret()]);
    }

    #[test]
    fn handlers_are_remapped() {
        let mut input = body(vec![nop(), ret(), nop(), ret(), ret()]);
        input.handlers = vec![
            Handler {
                start: InsnRef(0),
                end: InsnRef(2),
                handler: InsnRef(2),
                catch_type: None,
            },
            Handler {
                start: InsnRef(2),
                end: InsnRef(3),
                handler: InsnRef(4),
                catch_type: None,
            },
            Handler {
                start: InsnRef(3),
                end: InsnRef(5),
                handler: InsnRef(1),
                catch_type: None,
            },
        ];
        let output = eliminate_nops(&input);
        assert_eq!(output.instructions.len(), 3);
        assert_eq!(
            output.handlers,
            vec![
                Handler {
                    start: InsnRef(0),
                    end: InsnRef(1),
                    handler: InsnRef(1),
                    catch_type: None,
                },
                Handler {
                    start: InsnRef(1),
                    end: InsnRef(3),
                    handler: InsnRef(0),
                    catch_type: None,
                },
            ]
        );
        assert!(output.validate().is_ok());
    }

    #[test]
    fn nothing_to_remove() {
        let input = body(vec![goto(1), ret()]);
        assert_eq!(eliminate_nops(&input), input);
    }
}
