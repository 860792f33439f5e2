// deployer/src/artifacts.rs
// Hardhat build artifacts: lookup by contract name and library linking.

use crate::decoding::Interface;

use ethers::{
    abi::{Abi, ParamType, Token},
    solc::{artifacts::BytecodeObject, hh::HardhatArtifact},
    types::{Address, Bytes},
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("no artifact for contract {name} under {dir:?}")]
    NotFound { name: String, dir: PathBuf },
    #[error("contract name {name} is ambiguous: {candidates:?}")]
    Ambiguous { name: String, candidates: Vec<PathBuf> },
    #[error("failed to read {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse artifact {path:?}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("{contract} is abstract or an interface, it has no bytecode")]
    NoBytecode { contract: String },
    #[error("{contract} needs library {library} but no address was given")]
    MissingLibrary { contract: String, library: String },
    #[error("{contract} does not link against library {library}")]
    UnneededLibrary { contract: String, library: String },
    #[error("{contract} bytecode is not valid hex after linking")]
    InvalidBytecode { contract: String },
    #[error("constructor arguments for {contract} do not match its ABI: {message}")]
    Constructor { contract: String, message: String },
}

/// A Hardhat build artifact, ready to link and deploy.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: Abi,
    bytecode: Option<BytecodeObject>,
    /// source file -> library names, as listed in `linkReferences`
    libraries: BTreeMap<String, Vec<String>>,
}

impl From<HardhatArtifact> for Artifact {
    fn from(artifact: HardhatArtifact) -> Self {
        let libraries = artifact
            .link_references
            .into_iter()
            .map(|(source, libs)| (source, libs.into_keys().collect()))
            .collect();
        Self {
            contract_name: artifact.contract_name,
            source_name: artifact.source_name,
            abi: artifact.abi.abi,
            bytecode: artifact.bytecode,
            libraries,
        }
    }
}

impl Artifact {
    pub fn from_json(path: &Path, json: &str) -> Result<Self, ArtifactError> {
        serde_json::from_str::<HardhatArtifact>(json)
            .map(Self::from)
            .map_err(|source| ArtifactError::Parse { path: path.to_path_buf(), source })
    }

    /// Decoding interface over the artifact's ABI.
    pub fn interface(&self) -> Interface {
        Interface::new(self.contract_name.clone(), self.abi.clone())
    }

    /// Declared type of the constructor's `index`th parameter.
    pub fn constructor_input(&self, index: usize) -> Option<&ParamType> {
        self.abi.constructor.as_ref()?.inputs.get(index).map(|param| &param.kind)
    }

    fn links_library(&self, key: &str) -> bool {
        self.libraries.iter().any(|(source, libs)| {
            libs.iter().any(|lib| lib == key || format!("{}:{}", source, lib) == key)
        })
    }

    /// Substitutes every library placeholder in the creation bytecode.
    ///
    /// `libraries` is keyed by library name or by `source:name`. Every
    /// referenced library must be present and every given library must be
    /// referenced.
    pub fn link(&self, libraries: &BTreeMap<String, Address>) -> Result<Bytes, ArtifactError> {
        for key in libraries.keys() {
            if !self.links_library(key) {
                return Err(ArtifactError::UnneededLibrary {
                    contract: self.contract_name.clone(),
                    library: key.clone(),
                });
            }
        }

        let mut object = match &self.bytecode {
            Some(BytecodeObject::Bytecode(code)) if code.is_empty() => None,
            Some(object) => Some(object.clone()),
            None => None,
        }
        .ok_or_else(|| ArtifactError::NoBytecode { contract: self.contract_name.clone() })?;

        for (source, libs) in &self.libraries {
            for library in libs {
                let address = libraries
                    .get(library)
                    .or_else(|| libraries.get(&format!("{}:{}", source, library)))
                    .ok_or_else(|| ArtifactError::MissingLibrary {
                        contract: self.contract_name.clone(),
                        library: library.clone(),
                    })?;
                object.link(source, library, *address);
                debug!(contract = %self.contract_name, %library, ?address, "linked library");
            }
        }

        object
            .resolve()
            .cloned()
            .ok_or_else(|| ArtifactError::InvalidBytecode { contract: self.contract_name.clone() })
    }

    /// Creation payload: linked bytecode followed by the encoded constructor arguments.
    pub fn deployment_data(&self, bytecode: Bytes, args: &[Token]) -> Result<Bytes, ArtifactError> {
        match &self.abi.constructor {
            Some(constructor) => constructor
                .encode_input(bytecode.to_vec(), args)
                .map(Bytes::from)
                .map_err(|e| ArtifactError::Constructor {
                    contract: self.contract_name.clone(),
                    message: e.to_string(),
                }),
            None if args.is_empty() => Ok(bytecode),
            None => Err(ArtifactError::Constructor {
                contract: self.contract_name.clone(),
                message: format!("no constructor declared but {} argument(s) given", args.len()),
            }),
        }
    }
}

/// A Hardhat `artifacts/` directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locates `<name>.json`, skipping debug files and build info.
    pub fn find(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        let file_name = format!("{}.json", name);
        let mut candidates = Vec::new();
        collect_matches(&self.root, &file_name, &mut candidates)?;
        match candidates.len() {
            0 => Err(ArtifactError::NotFound { name: name.to_string(), dir: self.root.clone() }),
            1 => Ok(candidates.remove(0)),
            _ => {
                candidates.sort();
                Err(ArtifactError::Ambiguous { name: name.to_string(), candidates })
            }
        }
    }

    pub fn load(&self, name: &str) -> Result<Artifact, ArtifactError> {
        let path = self.find(name)?;
        let json = fs::read_to_string(&path).map_err(|source| ArtifactError::Io { path: path.clone(), source })?;
        Artifact::from_json(&path, &json)
    }
}

fn collect_matches(dir: &Path, file_name: &str, out: &mut Vec<PathBuf>) -> Result<(), ArtifactError> {
    let entries = fs::read_dir(dir).map_err(|source| ArtifactError::Io { path: dir.to_path_buf(), source })?;
    for entry in entries {
        let entry = entry.map_err(|source| ArtifactError::Io { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == "build-info") {
                continue;
            }
            collect_matches(&path, file_name, out)?;
        } else if path.file_name().is_some_and(|n| n == file_name) {
            out.push(path);
        }
    }
    Ok(())
}
