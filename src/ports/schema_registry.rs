use prost_reflect::MessageDescriptor;

/// SchemaRegistry defines the port for looking up message types by name.
///
/// Implementations are built once at startup and are read-only afterwards, so
/// a single instance is shared by every in-flight request.
pub trait SchemaRegistry: Send + Sync + 'static {
    /// Find a message type by its fully qualified name (e.g. `pkg.Req`).
    ///
    /// When several schema files declare the same name, the file registered
    /// first wins.
    fn find_message_type(&self, qualified_name: &str) -> Option<MessageDescriptor>;

    /// Number of schema files backing this registry
    fn file_count(&self) -> usize;

    /// Fully qualified names of every message type declared by the registered files
    fn message_type_names(&self) -> Vec<String>;
}
