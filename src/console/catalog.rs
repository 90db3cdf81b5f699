//! Local catalog of callable methods.
//!
//! Mirrors the server's registry for prompting and input coercion only; the
//! server stays authoritative and still validates every call.

use crate::functions::{MethodSpec, Registry};

#[derive(Debug, Clone)]
pub struct Catalog {
    methods: Vec<MethodSpec>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn new(methods: Vec<MethodSpec>) -> Self {
        Self { methods }
    }

    /// Catalog of the functions every server registers.
    pub fn builtin() -> Self {
        Self::new(Registry::builtin().catalog())
    }

    pub fn get(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    /// Help text listing every method with its description and parameters.
    pub fn help(&self) -> String {
        let mut out = String::from("\n=== Available functions ===\n");
        for method in &self.methods {
            let params: Vec<String> = method
                .params
                .iter()
                .map(|p| format!("{} ({})", p.name, p.ty))
                .collect();
            out.push_str(&format!("\n{}\n", method.name));
            out.push_str(&format!("  description: {}\n", method.description));
            out.push_str(&format!("  parameters:  {}\n", params.join(", ")));
        }
        out.push_str("\n===========================\n");
        out
    }
}
