use crate::stored_record;

// Child -> parent back-reference within the namespace tree, for both
// namespaces and corpora. Record key is the child uuid.
stored_record!(ParentLink, "parent_link", {
    parent_id: String
});
