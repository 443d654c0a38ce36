use core::{
    fmt::{self, Write},
    ptr::NonNull,
};
use std::collections::VecDeque;

use cordyceps::Linked;

use crate::{node::Node, AvlTree, Dir};

impl AvlTree {
    /// Writes a Graphviz rendering of the tree named `name` to `w`.
    ///
    /// Nodes are laid out one rank per level and labelled `key:balance`; missing children are
    /// drawn as points.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item {
            Node(NonNull<Node>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            write!(w, "{{rank=same; ")?;

            for _rank_node in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = unsafe { node.as_ref().key() };
                let balance = unsafe { Node::links(node).as_ref().balance() };
                write!(w, "\"graph{name}-{key}\" [label=\"{key}:{balance}\"]; ")?;

                for dir in [Dir::Left, Dir::Right] {
                    match unsafe { Node::links(node).as_ref().child(dir) } {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };

                            queue.push_back(Item::Node(child));
                            writeln!(
                                links,
                                "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}
