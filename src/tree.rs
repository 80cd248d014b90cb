//! Text rendering of a stream tree.
//!
//! Both renderers are pure functions of the tree's current state. They never load
//! anything and never fail: an unloaded collection is drawn as a placeholder.

use crate::stream::{CollectionKind, DataStreamCollection, Node, Params, StreamNode};

const INDENT: &str = "    ";
const UNSET: &str = "<Unset>";

const ICON_STREAM: &str = "📄";
const ICON_COLLECTION: &str = "📂";
const ICON_STATIC: &str = "🗂";
const ICON_UNLOADED: &str = "❓";
const ICON_READER: &str = "⬇️";
const ICON_WRITER: &str = "⬆️";

/// Switches for [`render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Leave out the `Debug` text of reader and writer parameters.
    pub exclude_params: bool,
    /// Emit reader/writer lines even when nothing is bound.
    pub print_if_unset: bool,
}

fn icon(node: &Node) -> String {
    match node {
        Node::Stream(s) => with_state(ICON_STREAM, s.has_data()),
        Node::Collection(c) => collection_icon(c),
    }
}

fn collection_icon(collection: &DataStreamCollection) -> String {
    let kind = match collection.kind() {
        CollectionKind::Static => ICON_STATIC,
        CollectionKind::Dynamic => ICON_COLLECTION,
    };
    with_state(kind, collection.has_data())
}

fn with_state(kind: &str, loaded: bool) -> String {
    if loaded {
        kind.to_string()
    } else {
        format!("{kind}{ICON_UNLOADED}")
    }
}

/// Renders `node` and everything below it as indented text.
///
/// ```text
/// 🗂 root
///     📄 a
///         ⬇️ csv
///     📂❓ sessions
///         ⬇️ file_mux
///         ❓ Not loaded
/// ```
pub fn render(node: &Node, options: TreeOptions) -> String {
    let mut out = format!("{} {}\n", icon(node), node.name());
    render_into(&mut out, node, INDENT, options);
    out
}

/// [`render`] for a collection that is not wrapped in a [`Node`].
pub fn render_collection(collection: &DataStreamCollection, options: TreeOptions) -> String {
    let mut out = format!("{} {}\n", collection_icon(collection), collection.name());
    render_collection_into(&mut out, collection, INDENT, options);
    out
}

fn render_into(out: &mut String, node: &Node, prefix: &str, options: TreeOptions) {
    match node {
        Node::Stream(stream) => render_io_lines(out, stream, prefix, options),
        Node::Collection(collection) => render_collection_into(out, collection, prefix, options),
    }
}

fn render_io_lines(out: &mut String, node: &dyn StreamNode, prefix: &str, options: TreeOptions) {
    render_io(out, ICON_READER, node.reader_name(), node.reader_params(), prefix, options);
    render_io(out, ICON_WRITER, node.writer_name(), node.writer_params(), prefix, options);
}

fn render_collection_into(
    out: &mut String,
    collection: &DataStreamCollection,
    prefix: &str,
    options: TreeOptions,
) {
    render_io_lines(out, collection, prefix, options);
    let Ok(streams) = collection.streams() else {
        out.push_str(&format!("{prefix}{ICON_UNLOADED} Not loaded\n"));
        return;
    };
    let child_prefix = format!("{prefix}{INDENT}");
    for child in streams.nodes() {
        out.push_str(&format!("{prefix}{} {}\n", icon(child), child.name()));
        render_into(out, child, &child_prefix, options);
    }
}

fn render_io(
    out: &mut String,
    marker: &str,
    name: Option<&str>,
    params: Option<&dyn Params>,
    prefix: &str,
    options: TreeOptions,
) {
    let Some(name) = name.or(options.print_if_unset.then_some(UNSET)) else {
        return;
    };
    out.push_str(&format!("{prefix}{marker} {name}\n"));
    if !options.exclude_params {
        match params {
            Some(params) => out.push_str(&format!("{prefix}   <{params:?}>\n")),
            None => out.push_str(&format!("{prefix}   {UNSET}\n")),
        }
    }
}

/// Renders the names only, using box-drawing branches.
///
/// ```text
/// 📂 dataset
/// ├── 📄 stream1
/// └── 📂 collection1
///     ├── 📄 nested_stream1
///     └── 📄 nested_stream2
/// ```
pub fn render_outline(node: &Node) -> String {
    let mut out = format!("{} {}\n", icon(node), node.name());
    outline_children(&mut out, node, "");
    out
}

fn outline_children(out: &mut String, node: &Node, prefix: &str) {
    let Some(streams) = node.as_collection().and_then(|c| c.streams().ok()) else {
        return;
    };
    let count = streams.len();
    for (i, child) in streams.nodes().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        out.push_str(&format!("{prefix}{branch}{} {}\n", icon(child), child.name()));
        let deeper = format!("{prefix}{}", if last { "    " } else { "│   " });
        outline_children(out, child, &deeper);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use crate::stream::{DataStream, DataStreamCollection, NullParams, Payload, Reader, Writer};

    #[derive(Debug)]
    struct PathParams {
        #[allow(dead_code)]
        path: &'static str,
    }

    impl Params for PathParams {}

    fn leaf(name: &str, path: &'static str) -> Node {
        DataStream::builder(name)
            .reader(Reader::new("text", |_: &PathParams| Ok(Payload::Text("t".into()))))
            .reader_params(PathParams { path })
            .build()
            .unwrap()
            .into()
    }

    #[test]
    fn renders_readers_and_placeholders() {
        let mut root: Node =
            DataStreamCollection::new_static("root", [leaf("a", "a.txt"), leaf("b", "b.txt")])
                .unwrap()
                .into();
        root.at_mut("a").unwrap().load().unwrap();

        let text = render(&root, TreeOptions::default());
        let expected = "\
🗂 root
    📄 a
        ⬇️ text
           <PathParams { path: \"a.txt\" }>
    📄❓ b
        ⬇️ text
           <PathParams { path: \"b.txt\" }>
";
        assert_eq!(text, expected);
    }

    #[test]
    fn exclude_params_hides_parameter_text() {
        let root: Node = DataStreamCollection::new_static("root", [leaf("a", "a.txt")])
            .unwrap()
            .into();
        let text = render(
            &root,
            TreeOptions {
                exclude_params: true,
                ..TreeOptions::default()
            },
        );
        assert!(!text.contains("PathParams"));
        assert!(text.contains("⬇️ text"));
    }

    #[test]
    fn print_if_unset_shows_missing_writer() {
        let node = leaf("a", "a.txt");
        assert!(!render(&node, TreeOptions::default()).contains(UNSET));
        let text = render(
            &node,
            TreeOptions {
                print_if_unset: true,
                ..TreeOptions::default()
            },
        );
        assert!(text.contains("⬆️ <Unset>"));
    }

    #[test]
    fn unloaded_collection_renders_placeholder() {
        let reader = Reader::new("dir", |_: &NullParams| -> AppResult<Vec<Node>> { Ok(vec![]) });
        let node: Node = DataStreamCollection::new("sessions", reader)
            .unwrap()
            .with_reader_params(NullParams)
            .unwrap()
            .into();
        let text = render(&node, TreeOptions::default());
        assert_eq!(text, "📂❓ sessions\n    ⬇️ dir\n       <NullParams>\n    ❓ Not loaded\n");
    }

    #[test]
    fn rendering_is_stable() {
        let writer = Writer::new("sink", |_: &Payload, _: &NullParams| Ok(()));
        let with_writer: Node = DataStream::builder("w")
            .writer(writer)
            .writer_params(NullParams)
            .build()
            .unwrap()
            .into();
        let root: Node =
            DataStreamCollection::new_static("root", [with_writer, leaf("z", "z"), leaf("a", "a")])
                .unwrap()
                .into();
        let first = render(&root, TreeOptions::default());
        assert_eq!(first, render(&root, TreeOptions::default()));
        let w = first.find("📄❓ w").unwrap();
        let z = first.find("📄❓ z").unwrap();
        let a = first.find("📄❓ a").unwrap();
        assert!(w < z && z < a);
    }

    #[test]
    fn outline_draws_branches() {
        let inner =
            DataStreamCollection::new_static("inner", [leaf("b", "b"), leaf("c", "c")]).unwrap();
        let root: Node =
            DataStreamCollection::new_static("root", [leaf("a", "a"), inner.into()])
                .unwrap()
                .into();
        let expected = "\
🗂 root
├── 📄❓ a
└── 🗂 inner
    ├── 📄❓ b
    └── 📄❓ c
";
        assert_eq!(render_outline(&root), expected);
    }
}
