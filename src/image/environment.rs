//! Language environments
//!
//! Each environment tag maps to a fixed, versioned toolchain: apt packages
//! plus any extra build steps. The table is static; unknown tags are
//! rejected when the configuration is parsed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A predefined language toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Python,
    Rust,
    Node,
    Go,
    Ruby,
    Java,
    Cpp,
    Php,
    Dotnet,
}

/// Static toolchain definition for an environment
struct Toolchain {
    packages: &'static [&'static str],
    steps: &'static [&'static str],
    env: &'static [(&'static str, &'static str)],
}

const PYTHON: Toolchain = Toolchain {
    packages: &[
        "python3",
        "python3-dev",
        "python3-pip",
        "python3-venv",
        "python3-setuptools",
        "pipx",
        "python3-poetry",
    ],
    steps: &[],
    env: &[],
};

const RUST: Toolchain = Toolchain {
    packages: &["pkg-config", "libssl-dev", "build-essential"],
    steps: &[
        "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y --default-toolchain stable",
        ". /root/.cargo/env && rustup component add rustfmt clippy rust-analyzer rust-src",
        ". /root/.cargo/env && cargo install cargo-watch cargo-edit cargo-expand",
    ],
    env: &[("PATH", "/root/.cargo/bin:${PATH}"), ("RUST_BACKTRACE", "1")],
};

const NODE: Toolchain = Toolchain {
    packages: &["nodejs", "npm", "yarnpkg"],
    steps: &["npm install -g n"],
    env: &[],
};

const GO: Toolchain = Toolchain {
    packages: &["golang", "gopls"],
    steps: &[],
    env: &[],
};

const RUBY: Toolchain = Toolchain {
    packages: &["ruby-full", "ruby-dev", "ruby-bundler", "rbenv"],
    steps: &[],
    env: &[],
};

const JAVA: Toolchain = Toolchain {
    packages: &["openjdk-17-jdk", "maven", "gradle"],
    steps: &[],
    env: &[],
};

const CPP: Toolchain = Toolchain {
    packages: &[
        "clang",
        "clang-tools",
        "clang-format",
        "cmake",
        "ninja-build",
        "ccache",
        "gdb",
        "valgrind",
    ],
    steps: &[],
    env: &[],
};

const PHP: Toolchain = Toolchain {
    packages: &["php", "php-cli", "php-mbstring", "php-xml", "composer"],
    steps: &[],
    env: &[],
};

const DOTNET: Toolchain = Toolchain {
    packages: &["dotnet-sdk-8.0", "nuget"],
    steps: &[],
    env: &[],
};

impl Environment {
    /// All environments in display order
    pub const ALL: [Environment; 9] = [
        Self::Python,
        Self::Rust,
        Self::Node,
        Self::Go,
        Self::Ruby,
        Self::Java,
        Self::Cpp,
        Self::Php,
        Self::Dotnet,
    ];

    /// Tag used in configuration files and image tags
    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Node => "node",
            Self::Go => "go",
            Self::Ruby => "ruby",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Php => "php",
            Self::Dotnet => "dotnet",
        }
    }

    fn toolchain(&self) -> &'static Toolchain {
        match self {
            Self::Python => &PYTHON,
            Self::Rust => &RUST,
            Self::Node => &NODE,
            Self::Go => &GO,
            Self::Ruby => &RUBY,
            Self::Java => &JAVA,
            Self::Cpp => &CPP,
            Self::Php => &PHP,
            Self::Dotnet => &DOTNET,
        }
    }

    /// apt packages installed for this environment
    pub fn packages(&self) -> &'static [&'static str] {
        self.toolchain().packages
    }

    /// Shell commands run after the packages are installed
    pub fn setup_steps(&self) -> &'static [&'static str] {
        self.toolchain().steps
    }

    /// Image environment variables set by this toolchain
    pub fn image_env(&self) -> &'static [(&'static str, &'static str)] {
        self.toolchain().env
    }

    /// Comma-separated list of every tag, for help and error messages
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(Environment::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|env| env.name() == s)
            .ok_or_else(|| {
                format!(
                    "unknown environment '{}' (available: {})",
                    s,
                    Self::available()
                )
            })
    }
}
