// ABOUTME: Compile-fail test verifying RevisionId and DigestId are not interchangeable.
// ABOUTME: This test should fail to compile, validating type safety.

use ekdosi::types::{DigestId, RevisionId};

fn takes_revision_id(_id: RevisionId) {}

fn main() {
    let digest = DigestId::new("sha256:abc123".to_string());
    takes_revision_id(digest); // ERROR: expected RevisionId, found DigestId
}
