//! Project-global configuration accumulation (spec.md §4.7 "Project-global
//! capture" and §3's `ProjectGlobals`).

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ToggleValue {
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Default)]
pub struct ProjectGlobals {
    pub vars: HashMap<String, String>,
    pub c_flags: Vec<String>,
    pub cpp_flags: Vec<String>,
    pub asm_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub all_flags: Vec<String>,
    pub defines: Vec<String>,
    pub includes: Vec<String>,
    pub feature_toggles: HashMap<String, ToggleValue>,
    pub origins: HashMap<String, Arc<str>>,
}

enum Bucket {
    C,
    Cpp,
    Asm,
    Link,
    All,
}

fn bucket_for(name: &str) -> Bucket {
    if name.ends_with("CXXFLAGS") || name.ends_with("CPPFLAGS") {
        Bucket::Cpp
    } else if name.ends_with("ASFLAGS") {
        Bucket::Asm
    } else if name.ends_with("LDFLAGS") || name.ends_with("LIBS") {
        Bucket::Link
    } else if name.ends_with("CFLAGS") {
        Bucket::C
    } else {
        Bucket::All
    }
}

fn is_boolish(token: &str) -> Option<bool> {
    match token.to_ascii_uppercase().as_str() {
        "1" | "ON" | "YES" | "TRUE" => Some(true),
        "0" | "OFF" | "NO" | "FALSE" => Some(false),
        _ => None,
    }
}

impl ProjectGlobals {
    /// Records one project-global assignment: splits its value into
    /// `-I`/`-D`/flag tokens routed to the bucket implied by the variable
    /// name's suffix (spec.md §4.7), and separately remembers the whole
    /// value for feature-toggle emission.
    pub fn record(&mut self, name: &str, value: &str, origin: Arc<str>) {
        self.vars.insert(name.to_string(), value.to_string());
        self.origins.insert(name.to_string(), origin);

        let tokens: Vec<&str> = value.split_whitespace().collect();
        let is_flag_named = matches!(bucket_for(name), Bucket::C | Bucket::Cpp | Bucket::Asm | Bucket::Link);
        if tokens.len() == 1 && !is_flag_named && !tokens[0].starts_with('-') {
            if let Some(b) = is_boolish(tokens[0]) {
                self.feature_toggles.insert(name.to_string(), ToggleValue::Bool(b));
            } else {
                self.feature_toggles
                    .insert(name.to_string(), ToggleValue::Str(tokens[0].to_string()));
            }
        }

        let bucket = match bucket_for(name) {
            Bucket::C => &mut self.c_flags,
            Bucket::Cpp => &mut self.cpp_flags,
            Bucket::Asm => &mut self.asm_flags,
            Bucket::Link => &mut self.link_flags,
            Bucket::All => &mut self.all_flags,
        };
        for token in tokens {
            if let Some(path) = token.strip_prefix("-I") {
                if !path.is_empty() {
                    self.includes.push(path.to_string());
                    continue;
                }
            }
            if let Some(def) = token.strip_prefix("-D") {
                if !def.is_empty() {
                    self.defines.push(def.to_string());
                    continue;
                }
            }
            bucket.push(token.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cflags_routes_to_c_bucket_and_splits_includes() {
        let mut globals = ProjectGlobals::default();
        globals.record("CFLAGS", "-O2 -Iinclude -DDEBUG", Arc::from("config.mk"));
        assert_eq!(globals.c_flags, vec!["-O2"]);
        assert_eq!(globals.includes, vec!["include"]);
        assert_eq!(globals.defines, vec!["DEBUG"]);
    }

    #[test]
    fn single_token_value_becomes_feature_toggle() {
        let mut globals = ProjectGlobals::default();
        globals.record("WITH_FOO", "1", Arc::from("config.mk"));
        assert!(matches!(
            globals.feature_toggles.get("WITH_FOO"),
            Some(ToggleValue::Bool(true))
        ));
    }

    #[test]
    fn cxxflags_routes_to_cpp_bucket() {
        let mut globals = ProjectGlobals::default();
        globals.record("CXXFLAGS", "-std=c++17", Arc::from("config.mk"));
        assert_eq!(globals.cpp_flags, vec!["-std=c++17"]);
    }
}
