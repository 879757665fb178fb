use crate::upload::types::{CandidateId, UploadCandidate, UploadContext};
use bytes::Bytes;
use derivative::Derivative;

pub const DEFAULT_ACTION: &str = "subir_adjunto";
pub const DEFAULT_STORAGE_ROOT: &str = "gestiones";

/// Fixed parts of every upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSettings {
    /// Operation code sent as `accion`.
    pub action: String,
    pub storage_root: String,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            action: DEFAULT_ACTION.to_string(),
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
        }
    }
}

impl RequestSettings {
    pub fn storage_path(&self, owner_record_id: u64, display_name: &str) -> String {
        let file_name = display_name.replace(&['/', '\\'][..], "_");
        let root = self.storage_root.trim_end_matches('/');
        if root.is_empty() {
            format!("{}/{}", owner_record_id, file_name)
        } else {
            format!("{}/{}/{}", root, owner_record_id, file_name)
        }
    }
}

/// One multipart POST for one candidate.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct UploadRequest {
    pub identity: CandidateId,
    pub file_name: String,
    pub mime_type: String,
    pub fields: Vec<(&'static str, String)>,
    #[derivative(Debug = "ignore")]
    pub payload: Bytes,
}

impl UploadRequest {
    pub fn build(
        candidate: UploadCandidate,
        context: &UploadContext,
        settings: &RequestSettings,
    ) -> Self {
        let (identity, display_name, mime_type, payload) = candidate.into_parts();
        let storage_path = settings.storage_path(context.owner_record_id(), &display_name);

        let mut fields = vec![
            ("accion", settings.action.clone()),
            ("user_id", context.actor_id().to_string()),
            ("gestion_id", context.owner_record_id().to_string()),
            ("workflow_id", context.workflow_id().to_string()),
        ];
        if let Some(unit_id) = context.unit_id() {
            fields.push(("unidad_id", unit_id.to_string()));
        }
        fields.push(("descripcion", display_name.clone()));
        fields.push(("ruta", storage_path));
        fields.push(("tipo", mime_type.clone()));

        Self {
            identity,
            file_name: display_name,
            mime_type,
            fields,
            payload,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_fields_from_context_and_candidate() {
        let candidate = UploadCandidate::new("a.pdf", "application/pdf", vec![1u8, 2, 3]);
        let identity = candidate.identity();
        let context = UploadContext::new(42, 7).unwrap().with_workflow(3).with_unit(9);

        let request = UploadRequest::build(candidate, &context, &RequestSettings::default());

        assert_eq!(request.identity, identity);
        assert_eq!(request.field("accion"), Some(DEFAULT_ACTION));
        assert_eq!(request.field("user_id"), Some("7"));
        assert_eq!(request.field("gestion_id"), Some("42"));
        assert_eq!(request.field("workflow_id"), Some("3"));
        assert_eq!(request.field("unidad_id"), Some("9"));
        assert_eq!(request.field("descripcion"), Some("a.pdf"));
        assert_eq!(request.field("ruta"), Some("gestiones/42/a.pdf"));
        assert_eq!(request.field("tipo"), Some("application/pdf"));
        assert_eq!(&request.payload[..], &[1u8, 2, 3]);
    }

    #[test]
    fn unit_field_is_omitted_when_absent() {
        let candidate = UploadCandidate::new("a.pdf", "application/pdf", Vec::new());
        let context = UploadContext::new(42, 7).unwrap();
        let request = UploadRequest::build(candidate, &context, &RequestSettings::default());

        assert_eq!(request.field("workflow_id"), Some("0"));
        assert_eq!(request.field("unidad_id"), None);
    }

    #[test]
    fn storage_path_is_scoped_to_owner() {
        let settings = RequestSettings::default();
        assert_eq!(settings.storage_path(5, "x/y.pdf"), "gestiones/5/x_y.pdf");

        let bare = RequestSettings {
            storage_root: String::new(),
            ..Default::default()
        };
        assert_eq!(bare.storage_path(5, "y.pdf"), "5/y.pdf");
    }
}
