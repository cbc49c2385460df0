use std::collections::HashMap;

use super::front::{Member, StageInterface, Variable};
use super::types::GlslType;
use crate::gfx::{ShaderStage, UniformKind, UniformValue};

/// One uniform location in a linked program. Arrays get one slot per
/// element and structs one slot per member.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    /// `None` for kinds the context cannot represent (matrices, `uint`).
    pub value: Option<UniformValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkedProgram {
    pub uniforms: Vec<UniformSlot>,
    /// Active vertex inputs and their locations.
    pub attributes: Vec<(String, u32)>,
}

impl LinkedProgram {
    /// Location of `name`. `arr` also resolves to `arr[0]`.
    pub(crate) fn uniform_index(&self, name: &str) -> Option<usize> {
        self.uniforms.iter().position(|u| u.name == name).or_else(|| {
            let first = format!("{name}[0]");
            self.uniforms.iter().position(|u| u.name == first)
        })
    }
}

/// Links compiled stages into a program. Errors are joined into one log.
pub(crate) fn link(stages: &[&StageInterface]) -> Result<LinkedProgram, String> {
    if stages.is_empty() {
        return Err("error: no shaders attached to the program".to_string());
    }

    let mut errors = Vec::new();

    let vertex: Vec<_> = stages.iter().filter(|s| s.stage == ShaderStage::Vertex).collect();
    let fragment: Vec<_> = stages.iter().filter(|s| s.stage == ShaderStage::Fragment).collect();
    if vertex.len() > 1 {
        errors.push("error: more than one vertex shader attached".to_string());
    }
    if fragment.len() > 1 {
        errors.push("error: more than one fragment shader attached".to_string());
    }

    for s in stages {
        if !s.has_main {
            errors.push(format!("error: {} shader lacks 'main'", s.stage));
        }
    }

    let es = stages.iter().filter(|s| s.version.es).count();
    if es != 0 && es != stages.len() {
        errors.push("error: cannot link ES and desktop shaders together".to_string());
    }

    if let (Some(vs), Some(fs)) = (vertex.first(), fragment.first()) {
        match_interfaces(vs, fs, &mut errors);
    }

    let mut ordered: Vec<&StageInterface> = stages.to_vec();
    ordered.sort_by_key(|s| s.stage == ShaderStage::Fragment);
    let uniforms = merge_uniforms(&ordered, &mut errors);

    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    let attributes = vertex
        .first()
        .map(|vs| assign_attributes(&vs.inputs))
        .unwrap_or_default();

    Ok(LinkedProgram { uniforms, attributes })
}

fn describe(ty: &GlslType, array: Option<u32>) -> String {
    match array {
        Some(n) => format!("{ty}[{n}]"),
        None => ty.to_string(),
    }
}

fn match_interfaces(vs: &StageInterface, fs: &StageInterface, errors: &mut Vec<String>) {
    for input in fs.inputs.iter().filter(|v| v.referenced) {
        let by_location = input
            .location
            .and_then(|loc| vs.outputs.iter().find(|o| o.location == Some(loc)));
        let output = by_location.or_else(|| vs.outputs.iter().find(|o| o.name == input.name));

        match output {
            None => errors.push(format!(
                "error: fragment shader input '{}' has no matching output in the vertex shader",
                input.name
            )),
            Some(out) if out.ty != input.ty || out.array != input.array => errors.push(format!(
                "error: '{}' is declared as '{}' in the vertex shader and as '{}' in the fragment shader",
                input.name,
                describe(&out.ty, out.array),
                describe(&input.ty, input.array),
            )),
            Some(_) => {}
        }
    }

    for block in &fs.in_blocks {
        match vs.out_blocks.iter().find(|b| b.name == block.name) {
            None if block.referenced => errors.push(format!(
                "error: fragment shader input block '{}' has no matching output block in the vertex shader",
                block.name
            )),
            Some(out) if out.members != block.members => errors.push(format!(
                "error: interface block '{}' differs between the vertex and fragment shaders",
                block.name
            )),
            _ => {}
        }
    }
}

type Structs = HashMap<String, Vec<Member>>;

fn merge_uniforms(stages: &[&StageInterface], errors: &mut Vec<String>) -> Vec<UniformSlot> {
    // (declaration, struct definitions of its stage, active in any stage)
    let mut merged: Vec<(&Variable, &Structs, bool)> = Vec::new();
    for stage in stages {
        for u in &stage.uniforms {
            match merged.iter_mut().find(|(m, _, _)| m.name == u.name) {
                Some((first, structs, active)) => {
                    if first.ty != u.ty || first.array != u.array {
                        errors.push(format!(
                            "error: uniform '{}' is declared as '{}' and as '{}' in different stages",
                            u.name,
                            describe(&first.ty, first.array),
                            describe(&u.ty, u.array),
                        ));
                    } else if let GlslType::Struct(name) = &u.ty {
                        if structs.get(name) != stage.structs.get(name) {
                            errors.push(format!("error: struct '{name}' is defined differently in different stages"));
                        }
                    }
                    *active |= u.referenced;
                }
                None => merged.push((u, &stage.structs, u.referenced)),
            }
        }
    }

    let mut slots = Vec::new();
    for (u, structs, _) in merged.into_iter().filter(|(_, _, active)| *active) {
        expand(&u.name, &u.ty, u.array, u.initializer, structs, &mut slots);
    }
    slots
}

/// Flattens one declaration into leaf slots: `arr[i]`, `s.member`, `s[i].member[j]`.
fn expand(
    name: &str,
    ty: &GlslType,
    array: Option<u32>,
    initializer: Option<UniformValue>,
    structs: &Structs,
    slots: &mut Vec<UniformSlot>,
) {
    let elements: Vec<String> = match array {
        Some(n) => (0..n).map(|i| format!("{name}[{i}]")).collect(),
        None => vec![name.to_string()],
    };

    for element in elements {
        if let GlslType::Struct(struct_name) = ty {
            for member in structs.get(struct_name).into_iter().flatten() {
                let path = format!("{element}.{}", member.name);
                expand(&path, &member.ty, member.array, None, structs, slots);
            }
            continue;
        }
        let kind = ty.uniform_kind();
        let value = initializer.and_then(|v| kind.coerce(v)).or_else(|| kind.zero());
        slots.push(UniformSlot { name: element, kind, value });
    }
}

/// Explicit locations first, then the lowest free location in declaration order.
fn assign_attributes(inputs: &[Variable]) -> Vec<(String, u32)> {
    let active: Vec<&Variable> = inputs.iter().filter(|v| v.referenced).collect();
    let mut taken: Vec<u32> = active.iter().filter_map(|v| v.location).collect();

    active
        .iter()
        .map(|v| {
            let location = v.location.unwrap_or_else(|| {
                let free = (0..).find(|l| !taken.contains(l)).unwrap_or_default();
                taken.push(free);
                free
            });
            (v.name.clone(), location)
        })
        .collect()
}
