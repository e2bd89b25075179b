//! Loading `.proto` files into the schema registry.
//!
//! Every listed file is compiled on its own (imports resolved through the
//! configured search paths), so two listed files may declare the same type
//! name. Lookups walk the files in the order they were listed and only see
//! types declared directly in each file, not the ones it imports.
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};

use crate::ports::schema_registry::SchemaRegistry;

/// One compiled schema file together with everything it imports
#[derive(Debug, Clone)]
pub struct SchemaFile {
    descriptor: FileDescriptor,
}

impl SchemaFile {
    /// Name of the file relative to its import path
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn pool(&self) -> &DescriptorPool {
        self.descriptor.parent_pool()
    }

    /// Find a message declared in this file (nested types included)
    pub fn find_message_type(&self, qualified_name: &str) -> Option<MessageDescriptor> {
        self.pool()
            .get_message_by_name(qualified_name)
            .filter(|message| message.parent_file().name() == self.name())
    }

    pub fn message_type_names(&self) -> Vec<String> {
        fn collect(message: MessageDescriptor, out: &mut Vec<String>) {
            out.push(message.full_name().to_string());
            for child in message.child_messages() {
                collect(child, out);
            }
        }

        let mut names = Vec::new();
        for message in self.descriptor.messages() {
            collect(message, &mut names);
        }
        names
    }
}

/// Ordered, immutable collection of schema files
#[derive(Debug, Clone, Default)]
pub struct ProtoRegistry {
    files: Vec<SchemaFile>,
}

impl ProtoRegistry {
    /// Compile `proto_files` in order, resolving imports through `import_paths`.
    pub fn load(proto_files: &[PathBuf], import_paths: &[PathBuf]) -> Result<Self> {
        if proto_files.is_empty() {
            return Err(eyre::eyre!("No proto files given"));
        }

        let mut files = Vec::with_capacity(proto_files.len());
        for proto_file in proto_files {
            let file = compile_file(proto_file, import_paths)
                .with_context(|| format!("Failed to load proto file {}", proto_file.display()))?;
            tracing::info!(
                file = %file.name(),
                message_types = file.message_type_names().len(),
                "Loaded schema file"
            );
            files.push(file);
        }

        Ok(Self { files })
    }

    pub fn files(&self) -> &[SchemaFile] {
        &self.files
    }
}

fn compile_file(proto_file: &Path, import_paths: &[PathBuf]) -> Result<SchemaFile> {
    let mut includes: Vec<PathBuf> = import_paths.to_vec();
    if let Some(parent) = proto_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        if proto_file.exists() && !includes.iter().any(|inc| inc == parent) {
            includes.push(parent.to_path_buf());
        }
    }
    if includes.is_empty() {
        includes.push(PathBuf::from("."));
    }

    let mut compiler = protox::Compiler::new(&includes)
        .with_context(|| format!("Invalid import paths {includes:?}"))?;
    compiler
        .open_file(proto_file)
        .with_context(|| format!("Failed to compile {}", proto_file.display()))?;
    let pool = compiler.descriptor_pool();

    // Only `proto_file` was opened explicitly; everything else came in as an import
    let file_name = compiler
        .files()
        .find(|file| !file.is_import())
        .map(|file| file.name().to_string())
        .ok_or_else(|| eyre::eyre!("No file compiled for {}", proto_file.display()))?;
    let descriptor = pool.get_file_by_name(&file_name).ok_or_else(|| {
        eyre::eyre!(
            "No file descriptor produced for {} ({file_name})",
            proto_file.display()
        )
    })?;

    Ok(SchemaFile { descriptor })
}

impl SchemaRegistry for ProtoRegistry {
    fn find_message_type(&self, qualified_name: &str) -> Option<MessageDescriptor> {
        self.files
            .iter()
            .find_map(|file| file.find_message_type(qualified_name))
    }

    fn file_count(&self) -> usize {
        self.files.len()
    }

    fn message_type_names(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|file| file.message_type_names())
            .collect()
    }
}
