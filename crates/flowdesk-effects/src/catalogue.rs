use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use flowdesk_core::catalogue::{ScheduleGroup, Template};
use flowdesk_core::error::Result;
use flowdesk_core::traits::{ScheduleCatalogue, TemplateCatalogue};

/// Schedule groups and message templates, loaded once.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogue {
    schedules: HashMap<String, ScheduleGroup>,
    templates: HashMap<String, Template>,
}

impl MemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schedule(&mut self, group: ScheduleGroup) {
        self.schedules.insert(group.id.clone(), group);
    }

    /// Templates are validated on the way in.
    pub fn add_template(&mut self, template: Template) -> Result<()> {
        template.validate()?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Load a JSON array of schedule groups.
    pub fn load_schedules(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let groups: Vec<ScheduleGroup> = serde_json::from_str(&content)?;
        let count = groups.len();
        for group in groups {
            self.add_schedule(group);
        }
        debug!(path = %path.display(), count, "Schedules loaded");
        Ok(count)
    }

    /// Load a JSON array of templates.
    pub fn load_templates(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let templates: Vec<Template> = serde_json::from_str(&content)?;
        let count = templates.len();
        for template in templates {
            self.add_template(template)?;
        }
        debug!(path = %path.display(), count, "Templates loaded");
        Ok(count)
    }

    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}

impl ScheduleCatalogue for MemoryCatalogue {
    fn get(&self, id: &str) -> Option<ScheduleGroup> {
        self.schedules.get(id).cloned()
    }
}

impl TemplateCatalogue for MemoryCatalogue {
    fn get(&self, id: &str) -> Option<Template> {
        self.templates.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesk_core::FlowdeskError;
    use std::io::Write;

    fn write_json(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_schedules() {
        let file = write_json(
            r#"[{"id":"1","name":"Comercial","rules":{
                "Segunda":{"active":true,"start":"08:00","end":"18:00"},
                "Domingo":{"active":false,"start":"00:00","end":"00:00"}}}]"#,
        );
        let mut catalogue = MemoryCatalogue::new();
        assert_eq!(catalogue.load_schedules(file.path()).unwrap(), 1);
        let group = ScheduleCatalogue::get(&catalogue, "1").unwrap();
        assert_eq!(group.rules.len(), 2);
        assert!(ScheduleCatalogue::get(&catalogue, "2").is_none());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let file = write_json(
            r#"[{"id":"t","name":"Menu","text":"Escolha","buttons":[
                {"id":"1","label":"a"},{"id":"2","label":"b"},
                {"id":"3","label":"c"},{"id":"4","label":"d"}]}]"#,
        );
        let mut catalogue = MemoryCatalogue::new();
        let err = catalogue.load_templates(file.path()).unwrap_err();
        assert!(matches!(err, FlowdeskError::Catalogue(_)));
        assert_eq!(catalogue.template_count(), 0);
    }
}
