//! Interface de linha de comando do ruvox baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (serve, accent)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ruvox — acentuação de texto russo e serviço assíncrono de síntese de voz.
#[derive(Debug, Parser)]
#[command(name = "ruvox", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ruvox.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inicia o serviço HTTP de síntese.
    Serve {
        /// Endereço de escuta; sobrescreve a configuração.
        #[arg(long)]
        host: Option<String>,

        /// Porta de escuta; sobrescreve a configuração.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Insere marcas de acento no texto (argumentos ou stdin) e imprime o resultado.
    Accent {
        /// Texto a acentuar. Se omitido, lê do stdin.
        text: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_serve_subcommand() {
        let cli = Cli::parse_from(["ruvox", "serve", "--port", "9000"]);
        match cli.command {
            Command::Serve { host, port } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected Serve command"),
        }
    }

    #[test]
    fn cli_parses_accent_words() {
        let cli = Cli::parse_from(["ruvox", "accent", "Привет", "мир"]);
        match cli.command {
            Command::Accent { text } => assert_eq!(text, vec!["Привет", "мир"]),
            _ => panic!("expected Accent command"),
        }
    }

    #[test]
    fn cli_accent_without_words_reads_stdin() {
        let cli = Cli::parse_from(["ruvox", "accent"]);
        assert!(matches!(cli.command, Command::Accent { text } if text.is_empty()));
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from(["ruvox", "--config", "/etc/ruvox.toml", "-v", "serve"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ruvox.toml")));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
