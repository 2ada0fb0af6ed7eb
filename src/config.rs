//! Configuração do ruvox carregada a partir de `ruvox.toml`.
//!
//! A struct [`ServiceConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! Variáveis de ambiente `RUVOX_*` têm precedência sobre o arquivo.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::scheduler::SchedulerConfig;

/// Arquivo de configuração padrão, relativo ao diretório atual.
pub const DEFAULT_CONFIG_PATH: &str = "ruvox.toml";

/// Configuração de nível superior carregada de `ruvox.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Endereço de escuta do serviço HTTP.
    pub host: String,

    /// Porta do serviço HTTP.
    pub port: u16,

    /// Diretório onde os arquivos de áudio sintetizados são gravados.
    pub output_dir: PathBuf,

    /// Diretório de uploads. Apenas repassado; o serviço não aceita uploads.
    pub upload_dir: PathBuf,

    /// Executável do motor de síntese, chamado como `engine [args...] <texto> <saída>`.
    pub engine_path: PathBuf,

    /// Argumentos extras passados ao motor antes do texto.
    pub engine_args: Vec<String>,

    /// Tempo máximo de uma síntese, em segundos.
    pub synthesis_timeout_secs: u64,

    /// Número de sínteses executadas em paralelo.
    pub workers: usize,

    /// Jobs aguardando um worker livre antes de o serviço responder 503.
    pub queue_capacity: usize,

    /// Timeout de cada chamada de callback, em segundos.
    pub callback_timeout_secs: u64,

    /// URL pública usada para montar `download_url` absoluto nos callbacks.
    pub public_base_url: Option<String>,

    /// Comando do anotador de acentos (lê texto no stdin, escreve `+vogal` no stdout).
    pub accent_command: PathBuf,

    /// Argumentos extras do anotador de acentos.
    pub accent_args: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            output_dir: PathBuf::from("shared"),
            upload_dir: PathBuf::from("uploads"),
            engine_path: PathBuf::from("quick-tts"),
            engine_args: Vec::new(),
            synthesis_timeout_secs: 300,
            workers: 2,
            queue_capacity: 64,
            callback_timeout_secs: 10,
            public_base_url: None,
            accent_command: PathBuf::from("ruaccent"),
            accent_args: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Carrega a configuração do caminho indicado (ou `ruvox.toml`).
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<ServiceConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Variáveis de ambiente têm precedência sobre o arquivo de configuração.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| var(key).filter(|value| !value.is_empty());

        if let Some(host) = var("RUVOX_HOST") {
            self.host = host;
        }
        if let Some(port) = var("RUVOX_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("RUVOX_PORT is not a valid port: {port}"))?;
        }
        if let Some(dir) = var("RUVOX_OUTPUT_DIR") {
            self.output_dir = dir.into();
        }
        if let Some(dir) = var("RUVOX_UPLOAD_DIR") {
            self.upload_dir = dir.into();
        }
        if let Some(engine) = var("RUVOX_ENGINE") {
            self.engine_path = engine.into();
        }
        if let Some(url) = var("RUVOX_PUBLIC_BASE_URL") {
            self.public_base_url = Some(url);
        }
        if let Some(command) = var("RUVOX_ACCENT_COMMAND") {
            self.accent_command = command.into();
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
        }
    }
}
