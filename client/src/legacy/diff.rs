use crate::legacy::value::TreeValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

/// One entry of a computed tree diff.
#[derive(Debug, Clone, PartialEq)]
pub struct TreePatch {
    pub path: Vec<String>,
    pub op: PatchOp,
    /// Absent for removals.
    pub value: Option<TreeValue>,
}

/// Compute the ordered patch list turning `old` into `new`.
///
/// Walks keys present in both sides (recursing into containers of the same
/// kind, replacing otherwise), emits a remove for every old key absent in
/// new, then an add for every new key absent in old.
pub fn generate(old: &TreeValue, new: &TreeValue) -> Vec<TreePatch> {
    let mut patches = Vec::new();
    if old.is_container() && old.same_container_kind(new) {
        generate_at(old, new, &mut Vec::new(), &mut patches);
    } else if old != new {
        patches.push(TreePatch {
            path: Vec::new(),
            op: PatchOp::Replace,
            value: Some(new.clone()),
        });
    }
    patches
}

fn generate_at(
    old: &TreeValue,
    new: &TreeValue,
    path: &mut Vec<String>,
    patches: &mut Vec<TreePatch>,
) {
    let old_keys = old.keys();
    let new_keys = new.keys();
    let mut deleted = false;

    for key in &old_keys {
        let Some(old_value) = old.get(key) else {
            continue;
        };
        match new.get(key) {
            Some(new_value) => {
                if old_value.is_container() && old_value.same_container_kind(new_value) {
                    path.push(key.clone());
                    generate_at(old_value, new_value, path, patches);
                    path.pop();
                } else if old_value != new_value {
                    let mut patch_path = path.clone();
                    patch_path.push(key.clone());
                    patches.push(TreePatch {
                        path: patch_path,
                        op: PatchOp::Replace,
                        value: Some(new_value.clone()),
                    });
                }
            }
            None => {
                let mut patch_path = path.clone();
                patch_path.push(key.clone());
                patches.push(TreePatch {
                    path: patch_path,
                    op: PatchOp::Remove,
                    value: None,
                });
                deleted = true;
            }
        }
    }

    // Same key count with no removals is treated as the same key set, so
    // the add pass is skipped. A rename at this level slips through as
    // zero ops here; kept for compatibility with the original protocol.
    if !deleted && new_keys.len() == old_keys.len() {
        return;
    }

    for key in &new_keys {
        if old.get(key).is_none() {
            let mut patch_path = path.clone();
            patch_path.push(key.clone());
            patches.push(TreePatch {
                path: patch_path,
                op: PatchOp::Add,
                value: new.get(key).cloned(),
            });
        }
    }
}
