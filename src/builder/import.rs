//! Copying a whole document's content in from another builder.

use std::rc::Rc;

use tracing::debug;

use super::XmlBuilder;
use crate::error::{Error, Result};
use crate::tree::{NodeId, NodeKind};

impl XmlBuilder {
    /// Deep-copies the root element of `source`'s document, with everything
    /// below it, as the last child of the current node.
    ///
    /// The whole tree is copied no matter where `source` is positioned.
    /// The source document is left untouched and this builder stays where
    /// it is. Importing a builder over the same document copies a snapshot
    /// of the root taken before the copy is attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the current node already contains
    /// text, if it is the document node of a document that has a root
    /// element, or if it cannot hold children at all.
    pub fn import_subtree(&self, source: &Self) -> Result<Self> {
        self.check_import_target()?;

        let same_document = Rc::ptr_eq(&self.doc, &source.doc);
        let imported = if same_document {
            let mut doc = self.doc.borrow_mut();
            let root = doc
                .root_element()
                .ok_or_else(|| Error::invalid_state("source document has no root element"))?;
            let snapshot = doc.snapshot(root);
            doc.graft(self.node, snapshot)
        } else {
            let source_doc = source.doc.borrow();
            let root = source_doc
                .root_element()
                .ok_or_else(|| Error::invalid_state("source document has no root element"))?;
            self.doc
                .borrow_mut()
                .import_subtree(self.node, &source_doc, root)
        };
        debug!(
            into = self.node.into_raw(),
            imported = imported.map(NodeId::into_raw),
            same_document,
            "imported builder content"
        );
        Ok(self.clone())
    }

    fn check_import_target(&self) -> Result<()> {
        let doc = self.doc.borrow();
        match doc.node(self.node).kind {
            NodeKind::Element { .. } => {
                if doc
                    .children(self.node)
                    .any(|child| doc.node(child).kind.is_text())
                {
                    return Err(Error::invalid_state(
                        "cannot import into an element that contains text",
                    ));
                }
                Ok(())
            }
            NodeKind::Document if doc.root_element().is_none() => Ok(()),
            NodeKind::Document => Err(Error::invalid_state(
                "cannot import a second root element into the document",
            )),
            ref other => Err(Error::invalid_state(format!(
                "cannot import into a {} node",
                other.label()
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn importee() -> XmlBuilder {
        XmlBuilder::create("Importee", None)
            .unwrap()
            .element("Importee", None)
            .unwrap()
            .attribute("awating-my", "new-home")
            .unwrap()
            .element("IsEntireSubtree", None)
            .unwrap()
            .element("Included", None)
            .unwrap()
    }

    #[test]
    fn test_import_copies_whole_source_tree() {
        let here = XmlBuilder::create("Importer", None)
            .unwrap()
            .element("Here", None)
            .unwrap();
        let source = importee();
        let after = here.import_subtree(&source).unwrap();
        assert_eq!(after, here);
        assert_eq!(
            here.as_string().unwrap(),
            "<Importer><Here><Importee><Importee awating-my=\"new-home\">\
             <IsEntireSubtree><Included/></IsEntireSubtree></Importee></Importee></Here></Importer>"
        );
        assert_eq!(
            source.as_string().unwrap(),
            "<Importee><Importee awating-my=\"new-home\">\
             <IsEntireSubtree><Included/></IsEntireSubtree></Importee></Importee>"
        );
    }

    #[test]
    fn test_import_into_text_element_fails() {
        let invalid = XmlBuilder::create("InvalidImporter", None)
            .unwrap()
            .text("BadBadBad")
            .unwrap();
        let err = invalid.import_subtree(&importee()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(invalid.as_string().unwrap(), "<InvalidImporter>BadBadBad</InvalidImporter>");
    }

    #[test]
    fn test_import_same_document() {
        let root = XmlBuilder::create("r", None).unwrap();
        let child = root.element("c", None).unwrap();
        child.import_subtree(&root).unwrap();
        assert_eq!(root.as_string().unwrap(), "<r><c><r><c/></r></c></r>");
    }

    #[test]
    fn test_import_into_document_with_root_fails() {
        let target = XmlBuilder::create("r", None).unwrap().document();
        assert!(matches!(
            target.import_subtree(&importee()),
            Err(Error::InvalidState(_))
        ));
    }
}
