//! Just enough GLSL front end for the software context: collects the declarations a linker
//! cares about and picks the shading kernel named by `#pragma kernel`.

use std::collections::{BTreeSet, HashMap};

use super::kernel::KernelKind;
use crate::error::{RenderError, Result, ShaderStage};

/// Declarations found in one compiled stage.
#[derive(Debug, Clone, Default)]
struct StageInterface {
    kernel: Option<KernelKind>,
    uniforms: BTreeSet<String>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

/// Linked view of a program: what it reads, what it declares, which kernel runs it.
#[derive(Debug, Clone)]
pub struct ProgramInterface {
    pub kernel: KernelKind,
    pub uniforms: BTreeSet<String>,  // Struct and array uniforms flattened to `name[i].field`.
    pub attributes: Vec<String>,
    pub varyings: Vec<String>,
}

impl ProgramInterface {
    pub fn declares_uniform(&self, name: &str) -> bool {
        return self.uniforms.contains(name);
    }
}

/// Compiles both stages and links them.
pub fn link(vertex_source: &str, fragment_source: &str) -> Result<ProgramInterface> {
    let vertex = compile_stage(vertex_source, ShaderStage::Vertex)?;
    let fragment = compile_stage(fragment_source, ShaderStage::Fragment)?;

    // compile_stage guarantees a kernel on success.
    let (Some(vertex_kernel), Some(fragment_kernel)) = (vertex.kernel, fragment.kernel) else {
        return Err(RenderError::ShaderLink(String::from("missing kernel")));
    };
    if vertex_kernel != fragment_kernel {
        return Err(RenderError::ShaderLink(format!(
            "vertex stage runs `{}` but fragment stage runs `{}`",
            vertex_kernel.name(),
            fragment_kernel.name()
        )));
    }
    for input in &fragment.inputs {
        if !vertex.outputs.contains(input) {
            return Err(RenderError::ShaderLink(format!(
                "fragment input `{}` is not written by the vertex stage",
                input
            )));
        }
    }

    let mut uniforms = vertex.uniforms;
    uniforms.extend(fragment.uniforms);
    return Ok(ProgramInterface {
        kernel: vertex_kernel,
        uniforms,
        attributes: vertex.inputs,
        varyings: vertex.outputs,
    });
}

fn compile_error(stage: ShaderStage, message: impl Into<String>) -> RenderError {
    return RenderError::ShaderCompile {
        stage,
        message: message.into(),
    };
}

fn compile_stage(source: &str, stage: ShaderStage) -> Result<StageInterface> {
    if source.trim().is_empty() {
        return Err(compile_error(stage, "empty source"));
    }

    let mut interface = StageInterface::default();
    let mut code = String::with_capacity(source.len());
    for line in strip_block_comments(source).lines() {
        let line = match line.find("//") {
            Some(position) => &line[..position],
            None => line,
        };
        let trimmed = line.trim();
        if let Some(directive) = trimmed.strip_prefix('#') {
            let words: Vec<&str> = directive.split_whitespace().collect();
            if let ["pragma", "kernel", name] = words.as_slice() {
                let kernel = KernelKind::from_name(name)
                    .ok_or_else(|| compile_error(stage, format!("unknown kernel `{}`", name)))?;
                interface.kernel = Some(kernel);
            }
            continue;
        }
        code.push_str(line);
        code.push('\n');
    }
    if interface.kernel.is_none() {
        return Err(compile_error(stage, "no `#pragma kernel` directive"));
    }

    let tokens = tokenize(&code);
    let mut structs: HashMap<String, Vec<(String, String, usize)>> = HashMap::new();
    let mut has_main = false;
    let mut brace_depth: i32 = 0;
    let mut paren_depth: i32 = 0;
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "{" => brace_depth += 1,
            "}" => {
                brace_depth -= 1;
                if brace_depth < 0 {
                    return Err(compile_error(stage, "unexpected `}`"));
                }
            }
            "(" => paren_depth += 1,
            ")" => paren_depth -= 1,
            _ => (),
        }
        if brace_depth != 0 || paren_depth != 0 {
            i += 1;
            continue;
        }

        match token {
            "void" if tokens.get(i + 1).map(String::as_str) == Some("main") => {
                has_main = has_main || tokens.get(i + 2).map(String::as_str) == Some("(");
            }
            "struct" => {
                let (name, fields, next) = parse_struct(&tokens, i + 1)
                    .ok_or_else(|| compile_error(stage, "malformed struct declaration"))?;
                structs.insert(name, fields);
                i = next;
                continue;
            }
            "uniform" | "in" | "out" | "attribute" | "varying" => {
                let (ty, name, len, next) = parse_declaration(&tokens, i + 1)
                    .ok_or_else(|| compile_error(stage, format!("malformed `{}` declaration", token)))?;
                match (token, stage) {
                    ("uniform", _) => expand_uniform(&name, &ty, len, &structs, &mut interface.uniforms),
                    ("in", _) | ("attribute", ShaderStage::Vertex) | ("varying", ShaderStage::Fragment) => {
                        interface.inputs.push(name)
                    }
                    ("out", ShaderStage::Vertex) | ("varying", ShaderStage::Vertex) => interface.outputs.push(name),
                    _ => (),
                }
                i = next;
                continue;
            }
            _ => (),
        }
        i += 1;
    }

    if brace_depth != 0 {
        return Err(compile_error(stage, "unbalanced braces"));
    }
    if !has_main {
        return Err(compile_error(stage, "no `void main()` entry point"));
    }
    return Ok(interface);
}

fn strip_block_comments(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        result.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return result,
        }
    }
    result.push_str(rest);
    return result;
}

/// Splits into identifiers/numbers and single punctuation characters.
fn tokenize(code: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in code.chars() {
        if c.is_alphanumeric() || c == '_' || c == '.' {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if !c.is_whitespace() {
            tokens.push(c.to_string());
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    return tokens;
}

fn is_qualifier(token: &str) -> bool {
    return matches!(token, "lowp" | "mediump" | "highp" | "flat" | "smooth" | "noperspective" | "const");
}

/// Parses `[qualifiers] type name [ '[' len ']' ] ;` starting at `start`.
/// Returns (type, name, array length or 0, index after the semicolon).
fn parse_declaration(tokens: &[String], start: usize) -> Option<(String, String, usize, usize)> {
    let mut i = start;
    while is_qualifier(tokens.get(i)?) {
        i += 1;
    }
    let ty = tokens.get(i)?.clone();
    let name = tokens.get(i + 1)?.clone();
    i += 2;
    let mut len = 0;
    if tokens.get(i)? == "[" {
        len = tokens.get(i + 1)?.parse().ok()?;
        if tokens.get(i + 2)? != "]" {
            return None;
        }
        i += 3;
    }
    if tokens.get(i)? != ";" {
        return None;
    }
    return Some((ty, name, len, i + 1));
}

/// Parses `name { fields } ;` starting right after the `struct` keyword.
#[allow(clippy::type_complexity)]
fn parse_struct(tokens: &[String], start: usize) -> Option<(String, Vec<(String, String, usize)>, usize)> {
    let name = tokens.get(start)?.clone();
    if tokens.get(start + 1)? != "{" {
        return None;
    }
    let mut fields = Vec::new();
    let mut i = start + 2;
    while tokens.get(i)? != "}" {
        let (ty, field, len, next) = parse_declaration(tokens, i)?;
        fields.push((ty, field, len));
        i = next;
    }
    i += 1;
    if tokens.get(i).map(String::as_str) == Some(";") {
        i += 1;
    }
    return Some((name, fields, i));
}

fn expand_uniform(
    name: &str,
    ty: &str,
    len: usize,
    structs: &HashMap<String, Vec<(String, String, usize)>>,
    out: &mut BTreeSet<String>,
) {
    let names: Vec<String> = if len == 0 {
        vec![name.to_string()]
    } else {
        (0..len).map(|index| format!("{}[{}]", name, index)).collect()
    };
    for name in names {
        match structs.get(ty) {
            Some(fields) => {
                for (field_ty, field, field_len) in fields {
                    expand_uniform(&format!("{}.{}", name, field), field_ty, *field_len, structs, out);
                }
            }
            None => {
                out.insert(name);
            }
        }
    }
}
