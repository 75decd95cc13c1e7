use std::collections::BTreeMap;

use crate::compiler::ast::{Define, Expr, Node, Section, Variable};
use crate::environment::{Environment, UndefinedBehavior};
use crate::error::{Error, ErrorKind};
use crate::output::Output;
use crate::value::Value;

/// Partial and inherit expansion share the render call stack; a template
/// that includes itself would otherwise recurse until stack exhaustion.
const MAX_RENDER_DEPTH: usize = 100;

/// The override set of an inherit tag: block name to the nodes
/// substituted for the block.
type BlockOverrides = BTreeMap<String, Vec<Node>>;

/// One frame of the override stack.
///
/// Each active inherit contributes a frame; the stack is threaded through
/// the recursive render calls as a linked list.  A define resolves
/// against the top frame only.  Substituted content comes from the
/// inheriting template, so it renders under that template's own frame,
/// which is the top frame's parent; this is what lets an inner template
/// forward a block to its parent by re-declaring it.
struct OverrideFrame<'a> {
    blocks: &'a BlockOverrides,
    parent: Option<&'a OverrideFrame<'a>>,
}

/// Walks a node tree against a context value and writes output.
///
/// The renderer never mutates nodes.  The override stack and the output
/// sink are per render, so one environment can serve concurrent renders.
pub(crate) struct Renderer<'env> {
    env: &'env Environment,
}

impl<'env> Renderer<'env> {
    pub fn new(env: &'env Environment) -> Renderer<'env> {
        Renderer { env }
    }

    pub fn render(&self, root: &Node, ctx: &Value, out: &mut Output) -> Result<(), Error> {
        self.render_node(root, ctx, None, 0, out)
    }

    fn render_node(
        &self,
        node: &Node,
        ctx: &Value,
        overrides: Option<&OverrideFrame>,
        depth: usize,
        out: &mut Output,
    ) -> Result<(), Error> {
        match node {
            Node::List(list) => {
                for child in &list.children {
                    ok!(self.render_node(child, ctx, overrides, depth, out));
                }
                Ok(())
            }
            Node::Text(text) => out.write_str(&text.text).map_err(Error::from),
            Node::Comment(_) => Ok(()),
            Node::Variable(variable) => self.render_variable(variable, ctx, out),
            Node::Section(section) => self.render_section(section, ctx, overrides, depth, out),
            Node::Partial(partial) => {
                let root = ok!(self.env.get_template(&partial.name));
                ok!(check_depth(depth));
                // Partials keep the override scope of the caller.
                self.render_node(&root, ctx, overrides, depth + 1, out)
            }
            Node::Inherit(inherit) => {
                let root = ok!(self.env.get_template(&inherit.name));
                ok!(check_depth(depth));
                let frame = OverrideFrame {
                    blocks: &inherit.overrides,
                    parent: overrides,
                };
                self.render_node(&root, ctx, Some(&frame), depth + 1, out)
            }
            Node::Define(define) => self.render_define(define, ctx, overrides, depth, out),
            Node::Close(_) => Err(Error::new(
                ErrorKind::InvalidOperation,
                "encountered a close node while rendering; the tree was not produced by the parser",
            )),
        }
    }

    fn render_variable(
        &self,
        variable: &Variable,
        ctx: &Value,
        out: &mut Output,
    ) -> Result<(), Error> {
        let head = match &variable.head {
            // Literal heads render their unparsed text.
            Expr::String(lit) => return out.write_str(&lit.text).map_err(Error::from),
            Expr::Number(lit) => return out.write_str(&lit.text).map_err(Error::from),
            Expr::Identifier(head) => head,
        };

        let name = head.name();
        let value = ctx.get_path(&head.segments);
        let value = if value.is_undefined() {
            match self.env.get_function(&name) {
                Some(function) => {
                    let args = ok!(self.eval_args(&variable.tail, ctx));
                    ok!((*function)(&args))
                }
                None if !variable.tail.is_empty() => {
                    return Err(Error::new(
                        ErrorKind::UndefinedError,
                        format!("undefined function: {name}"),
                    ));
                }
                None => {
                    return match self.env.undefined_behavior() {
                        UndefinedBehavior::Lenient => Ok(()),
                        UndefinedBehavior::Strict => Err(Error::new(
                            ErrorKind::UndefinedError,
                            format!("undefined variable: {name}"),
                        )),
                    };
                }
            }
        } else if !variable.tail.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("{name} is not callable"),
            ));
        } else {
            value
        };

        if let Some(reason) = value.as_invalid() {
            return Err(Error::new(ErrorKind::BadSerialization, reason.to_string()));
        }
        write!(out, "{value}").map_err(Error::from)
    }

    fn eval_args(&self, tail: &[Expr], ctx: &Value) -> Result<Vec<Value>, Error> {
        let mut args = Vec::with_capacity(tail.len());
        for expr in tail {
            args.push(match expr {
                Expr::Identifier(id) => {
                    let value = ctx.get_path(&id.segments);
                    if value.is_undefined()
                        && self.env.undefined_behavior() == UndefinedBehavior::Strict
                    {
                        return Err(Error::new(
                            ErrorKind::UndefinedError,
                            format!("undefined variable: {}", id.name()),
                        ));
                    }
                    value
                }
                // Literal arguments pass through as their unparsed text.
                Expr::String(lit) => Value::from(lit.text.as_str()),
                Expr::Number(lit) => Value::from(lit.text.as_str()),
            });
        }
        Ok(args)
    }

    fn render_section(
        &self,
        section: &Section,
        ctx: &Value,
        overrides: Option<&OverrideFrame>,
        depth: usize,
        out: &mut Output,
    ) -> Result<(), Error> {
        let value = ctx.get_path(&section.head.segments);

        if section.inverted {
            // The body renders exactly once if the plain section over the
            // same value would have rendered zero times.
            let renders_zero_times = match value.as_seq() {
                Some(seq) => seq.is_empty(),
                None => !value.is_true(),
            };
            if renders_zero_times {
                for child in &section.children {
                    ok!(self.render_node(child, ctx, overrides, depth, out));
                }
            }
            return Ok(());
        }

        match value.as_seq() {
            Some(seq) => {
                for element in seq {
                    for child in &section.children {
                        ok!(self.render_node(child, element, overrides, depth, out));
                    }
                }
                Ok(())
            }
            None if value.is_true() => {
                for child in &section.children {
                    ok!(self.render_node(child, ctx, overrides, depth, out));
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn render_define(
        &self,
        define: &Define,
        ctx: &Value,
        overrides: Option<&OverrideFrame>,
        depth: usize,
        out: &mut Output,
    ) -> Result<(), Error> {
        if let Some(bucket) = overrides.and_then(|frame| frame.blocks.get(&define.name)) {
            // Substituted content belongs to the inheriting template, so
            // it renders one frame down the stack.
            let parent = overrides.and_then(|frame| frame.parent);
            for node in bucket {
                ok!(self.render_node(node, ctx, parent, depth, out));
            }
            Ok(())
        } else {
            // No override for this block: a define renders its body in
            // place.
            for child in &define.children {
                ok!(self.render_node(child, ctx, overrides, depth, out));
            }
            Ok(())
        }
    }
}

fn check_depth(depth: usize) -> Result<(), Error> {
    if depth >= MAX_RENDER_DEPTH {
        Err(Error::new(
            ErrorKind::InvalidOperation,
            "recursion limit exceeded while expanding partials and inherited templates",
        ))
    } else {
        Ok(())
    }
}
