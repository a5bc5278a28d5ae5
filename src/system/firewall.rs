use super::Runner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firewall {
    Ufw,
    Firewalld,
    Iptables,
}

impl Firewall {
    /// First active firewall front-end on the host, if any.
    pub async fn detect(runner: &dyn Runner) -> Option<Self> {
        if runner.exists("ufw").await {
            match runner.output("ufw", &["status"]).await {
                Ok(status) if status.contains("Status: active") => return Some(Firewall::Ufw),
                _ => log::debug!("ufw is installed but not active"),
            }
        }
        if runner.exists("firewall-cmd").await && runner.run("firewall-cmd", &["--state"]).await.is_ok() {
            return Some(Firewall::Firewalld);
        }
        if runner.exists("iptables").await {
            return Some(Firewall::Iptables);
        }
        None
    }

    pub fn commands(&self, port: u16) -> Vec<(&'static str, Vec<String>)> {
        let mut commands = vec![];
        for proto in ["tcp", "udp"] {
            match self {
                Firewall::Ufw => commands.push(("ufw", vec!["allow".to_string(), format!("{port}/{proto}")])),
                Firewall::Firewalld => commands.push((
                    "firewall-cmd",
                    vec!["--permanent".to_string(), format!("--add-port={port}/{proto}")],
                )),
                Firewall::Iptables => commands.push((
                    "iptables",
                    ["-I", "INPUT", "-p", proto, "--dport", port.to_string().as_str(), "-j", "ACCEPT"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                )),
            }
        }
        if *self == Firewall::Firewalld {
            commands.push(("firewall-cmd", vec!["--reload".to_string()]));
        }
        commands
    }

    pub async fn allow(&self, runner: &dyn Runner, port: u16) -> anyhow::Result<()> {
        for (program, args) in self.commands(port) {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            runner.run(program, &args).await?;
        }
        log::info!("opened port {port} (tcp/udp) with {:?}", self);
        Ok(())
    }
}

/// Opens `port` on whatever firewall is active. No firewall is only a warning.
pub async fn open_port(runner: &dyn Runner, port: u16) -> anyhow::Result<()> {
    match Firewall::detect(runner).await {
        Some(firewall) => firewall.allow(runner, port).await,
        None => {
            log::warn!("no firewall tool found, make sure port {port} is reachable");
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::system::test::RecordingRunner;

    #[tokio::test]
    async fn active_ufw_wins() -> anyhow::Result<()> {
        let mut runner = RecordingRunner::with_programs(&["ufw", "iptables"]);
        runner.outputs.insert("ufw status".to_string(), "Status: active\n".to_string());
        open_port(&runner, 8443).await?;
        assert_eq!(
            runner.commands(),
            vec!["ufw status", "ufw allow 8443/tcp", "ufw allow 8443/udp"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn inactive_ufw_falls_through() -> anyhow::Result<()> {
        let mut runner = RecordingRunner::with_programs(&["ufw", "firewall-cmd"]);
        runner.outputs.insert("ufw status".to_string(), "Status: inactive\n".to_string());
        open_port(&runner, 443).await?;
        assert_eq!(
            runner.commands(),
            vec![
                "ufw status",
                "firewall-cmd --state",
                "firewall-cmd --permanent --add-port=443/tcp",
                "firewall-cmd --permanent --add-port=443/udp",
                "firewall-cmd --reload",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn stopped_firewalld_uses_iptables() -> anyhow::Result<()> {
        let runner = RecordingRunner::with_programs(&["firewall-cmd", "iptables"]).fail_on("firewall-cmd --state");
        open_port(&runner, 8388).await?;
        assert_eq!(
            runner.commands(),
            vec![
                "firewall-cmd --state",
                "iptables -I INPUT -p tcp --dport 8388 -j ACCEPT",
                "iptables -I INPUT -p udp --dport 8388 -j ACCEPT",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn no_firewall_is_not_an_error() -> anyhow::Result<()> {
        let runner = RecordingRunner::default();
        open_port(&runner, 8388).await?;
        assert!(runner.commands().is_empty());
        Ok(())
    }
}
