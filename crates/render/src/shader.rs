use lensing_common::ShaderParams;

/// Errors from parsing a fragment-shader template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
    #[error("unknown placeholder: {0}")]
    UnknownPlaceholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Param(String),
}

/// A parsed fragment-shader template.
///
/// Placeholders use mustache syntax, `{{ key }}`, where `key` is one of
/// [`ShaderParams::KEYS`]. Keys are validated once at parse time, so
/// rendering cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    segments: Vec<Segment>,
}

impl ShaderTemplate {
    pub fn parse(text: &str) -> Result<Self, ShaderError> {
        let mut segments = Vec::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let body = &rest[start + 2..];
            let end = body
                .find("}}")
                .ok_or(ShaderError::Unterminated(offset + start))?;
            let key = body[..end].trim();
            if !ShaderParams::is_known_key(key) {
                return Err(ShaderError::UnknownPlaceholder(key.to_string()));
            }
            segments.push(Segment::Param(key.to_string()));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Substitute `params` into the template.
    pub fn render(&self, params: &ShaderParams) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param(key) => {
                    // Keys were checked against ShaderParams::KEYS in parse().
                    if let Some(value) = params.lookup(key) {
                        out.push_str(&value.to_string());
                    }
                }
            }
        }
        out
    }

    /// Parameter keys referenced by the template, in order of first use.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Param(key) = segment {
                if !keys.contains(&key.as_str()) {
                    keys.push(key.as_str());
                }
            }
        }
        keys
    }

    pub fn references(&self, key: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(k) if k == key))
    }
}

/// Shader parameters bound to a template, plus the dirty flag the render
/// loop consumes.
///
/// Every path that changes what [`Shader::compile`] would return goes through
/// a method here, so the flag is the single signal that a rebuild is due.
#[derive(Debug, Clone)]
pub struct Shader {
    template: ShaderTemplate,
    params: ShaderParams,
    needs_update: bool,
}

impl Shader {
    /// A new shader starts dirty: nothing has been compiled for it yet.
    pub fn new(template: &str, params: ShaderParams) -> Result<Self, ShaderError> {
        Ok(Self {
            template: ShaderTemplate::parse(template)?,
            params,
            needs_update: true,
        })
    }

    pub fn with_defaults(template: &str) -> Result<Self, ShaderError> {
        Self::new(template, ShaderParams::default())
    }

    pub fn params(&self) -> &ShaderParams {
        &self.params
    }

    pub fn template(&self) -> &ShaderTemplate {
        &self.template
    }

    /// Replace the parameter record. Marks the shader dirty only on change.
    pub fn set_params(&mut self, params: ShaderParams) {
        if params != self.params {
            tracing::debug!(?params, "shader parameters changed");
            self.params = params;
            self.needs_update = true;
        }
    }

    /// Edit parameters in place, e.g. from a control panel.
    pub fn update_params(&mut self, edit: impl FnOnce(&mut ShaderParams)) {
        let mut next = self.params;
        edit(&mut next);
        self.set_params(next);
    }

    pub fn mark_dirty(&mut self) {
        self.needs_update = true;
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Read and clear the dirty flag.
    pub fn take_needs_update(&mut self) -> bool {
        std::mem::take(&mut self.needs_update)
    }

    /// Fragment-shader source for the current parameters.
    pub fn compile(&self) -> String {
        self.template.render(&self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "const N_STEPS: i32 = {{n_steps}};\n\
                            const DISTANCE: f32 = {{ observer.distance }};\n\
                            fn f() { if (true) { return; }}\n";

    #[test]
    fn parse_collects_placeholders() {
        let t = ShaderTemplate::parse(TEMPLATE).unwrap();
        assert_eq!(t.placeholders(), vec!["n_steps", "observer.distance"]);
        assert!(t.references("n_steps"));
        assert!(!t.references("time_scale"));
    }

    #[test]
    fn parse_rejects_unknown_key() {
        let err = ShaderTemplate::parse("x = {{ observer.mass }};").unwrap_err();
        assert_eq!(err, ShaderError::UnknownPlaceholder("observer.mass".into()));
    }

    #[test]
    fn parse_rejects_unterminated_placeholder() {
        let err = ShaderTemplate::parse("abc {{n_steps").unwrap_err();
        assert_eq!(err, ShaderError::Unterminated(4));
    }

    #[test]
    fn template_without_placeholders_renders_verbatim() {
        let t = ShaderTemplate::parse("void main() {}").unwrap();
        assert_eq!(t.render(&ShaderParams::default()), "void main() {}");
        assert!(t.placeholders().is_empty());
    }

    #[test]
    fn compile_substitutes_defaults() {
        let shader = Shader::with_defaults(TEMPLATE).unwrap();
        let src = shader.compile();
        assert!(src.contains("const N_STEPS: i32 = 100;"));
        assert!(src.contains("const DISTANCE: f32 = 11.0;"));
        assert!(src.contains("fn f() { if (true) { return; }}"));
    }

    #[test]
    fn compile_is_deterministic() {
        let shader = Shader::with_defaults(TEMPLATE).unwrap();
        assert_eq!(shader.compile(), shader.compile());
    }

    #[test]
    fn referenced_parameter_changes_output() {
        let mut shader = Shader::with_defaults(TEMPLATE).unwrap();
        let before = shader.compile();
        shader.update_params(|p| p.n_steps = 250);
        assert_ne!(shader.compile(), before);

        let before = shader.compile();
        shader.update_params(|p| p.observer.distance = 20.0);
        assert_ne!(shader.compile(), before);
    }

    #[test]
    fn unreferenced_parameter_leaves_output_alone() {
        let mut shader = Shader::with_defaults(TEMPLATE).unwrap();
        let before = shader.compile();
        shader.update_params(|p| p.time_scale = 3.0);
        assert_eq!(shader.compile(), before);
        shader.update_params(|p| p.observer.orbital_inclination = 45.0);
        assert_eq!(shader.compile(), before);
    }

    #[test]
    fn new_shader_starts_dirty() {
        let mut shader = Shader::with_defaults(TEMPLATE).unwrap();
        assert!(shader.needs_update());
        assert!(shader.take_needs_update());
        assert!(!shader.needs_update());
        assert!(!shader.take_needs_update());
    }

    #[test]
    fn identical_params_do_not_mark_dirty() {
        let mut shader = Shader::with_defaults(TEMPLATE).unwrap();
        shader.take_needs_update();
        shader.set_params(ShaderParams::default());
        shader.update_params(|p| p.n_steps = 100);
        assert!(!shader.needs_update());
    }

    #[test]
    fn changed_params_mark_dirty() {
        let mut shader = Shader::with_defaults(TEMPLATE).unwrap();
        shader.take_needs_update();
        shader.update_params(|p| p.time_scale = 0.5);
        assert!(shader.needs_update());
        assert_eq!(shader.params().time_scale, 0.5);
    }
}
