//! The container a communicator talks to

/// Default name of the LXD command-line client
pub const DEFAULT_CLI: &str = "lxc";

/// Identifies a running LXD container and how to reach it through the CLI
///
/// A target is immutable once built; everything derived from it is a pure
/// string operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    name: String,
    remote: Option<String>,
    cli: String,
    sudo_exec: bool,
}

impl ContainerTarget {
    /// Create a target for the container with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: None,
            cli: DEFAULT_CLI.to_string(),
            sudo_exec: true,
        }
    }

    /// Address the container on a named LXD remote
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Use a different `lxc` program
    ///
    /// The value is inserted into command lines verbatim, so it may carry a
    /// prefix of its own, such as `snap run lxd.lxc`.
    pub fn with_cli(mut self, cli: impl Into<String>) -> Self {
        self.cli = cli.into();
        self
    }

    /// Choose whether `exec` invocations are run through `sudo`
    pub fn with_sudo_exec(mut self, enabled: bool) -> Self {
        self.sudo_exec = enabled;
        self
    }

    /// Container name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// LXD remote, if one was configured
    pub fn remote(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    /// The `lxc` program
    pub fn cli(&self) -> &str {
        &self.cli
    }

    /// Whether `exec` invocations are prefixed with `sudo`
    pub fn sudo_exec(&self) -> bool {
        self.sudo_exec
    }

    /// The container reference `lxc exec` expects: `[remote:]name`
    pub fn instance(&self) -> String {
        match &self.remote {
            Some(remote) => format!("{remote}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Qualify a container path the way `lxc file` expects: `[remote:]name/path`
    ///
    /// Repeated separators are collapsed and `.` segments dropped, so both
    /// `/etc/hosts` and `etc//hosts` become `name/etc/hosts`.
    pub fn qualify(&self, path: &str) -> String {
        let clean = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");

        if clean.is_empty() {
            self.instance()
        } else {
            format!("{}/{clean}", self.instance())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let target = ContainerTarget::new("build-box");
        assert_eq!(target.name(), "build-box");
        assert_eq!(target.cli(), "lxc");
        assert!(target.sudo_exec());
        assert_eq!(target.remote(), None);
        assert_eq!(target.instance(), "build-box");
    }

    #[test]
    fn test_qualify() {
        let target = ContainerTarget::new("build-box");
        assert_eq!(target.qualify("/etc/hosts"), "build-box/etc/hosts");
        assert_eq!(target.qualify("etc//hosts"), "build-box/etc/hosts");
        assert_eq!(target.qualify("./tmp/./a"), "build-box/tmp/a");
        assert_eq!(target.qualify("/"), "build-box");
    }

    #[test]
    fn test_qualify_with_remote() {
        let target = ContainerTarget::new("build-box").with_remote("images");
        assert_eq!(target.instance(), "images:build-box");
        assert_eq!(target.qualify("/root/a.txt"), "images:build-box/root/a.txt");
    }
}
