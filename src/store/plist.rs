//! XML property-list rendering for the managed document and the login hook.

use std::fmt::Write;
use std::path::Path;

use crate::bundle::Bundle;
use crate::setting::Value;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
"#;

const FOOTER: &str = "</dict>\n</plist>\n";

/// Render `bundle` as a complete plist document with one entry per setting.
pub fn render(bundle: &Bundle) -> String {
    let mut out = String::from(HEADER);
    for setting in bundle {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "\t<key>{}</key>", escape(setting.key()));
        let _ = match setting.value() {
            Value::Bool(true) => writeln!(out, "\t<true/>"),
            Value::Bool(false) => writeln!(out, "\t<false/>"),
            Value::Integer(n) => writeln!(out, "\t<integer>{n}</integer>"),
            Value::Str(s) => writeln!(out, "\t<string>{}</string>", escape(s)),
        };
    }
    out.push_str(FOOTER);
    out
}

/// A LaunchAgent that runs `program` once at login, sending both output
/// streams to `log`.
pub fn launch_agent(label: &str, program: &[String], log: &Path) -> String {
    let log = escape(&log.to_string_lossy());
    let mut out = String::from(HEADER);
    let _ = writeln!(out, "\t<key>Label</key>\n\t<string>{}</string>", escape(label));
    out.push_str("\t<key>ProgramArguments</key>\n\t<array>\n");
    for arg in program {
        let _ = writeln!(out, "\t\t<string>{}</string>", escape(arg));
    }
    out.push_str("\t</array>\n");
    out.push_str("\t<key>RunAtLoad</key>\n\t<true/>\n");
    let _ = writeln!(out, "\t<key>StandardOutPath</key>\n\t<string>{log}</string>");
    let _ = writeln!(out, "\t<key>StandardErrorPath</key>\n\t<string>{log}</string>");
    out.push_str(FOOTER);
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::Setting;

    #[test]
    fn renders_each_kind() {
        let bundle = Bundle::from_settings(vec![
            Setting::new("BraveRewardsDisabled", Value::Bool(true)).unwrap(),
            Setting::new("TorDisabled", Value::Bool(false)).unwrap(),
            Setting::new("DnsOverHttpsMode", Value::Str("automatic".into())).unwrap(),
            Setting::new("DefaultGeolocationSetting", Value::Integer(2)).unwrap(),
        ])
        .unwrap();
        let xml = render(&bundle);

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<key>BraveRewardsDisabled</key>\n\t<true/>"));
        assert!(xml.contains("<key>TorDisabled</key>\n\t<false/>"));
        assert!(xml.contains("<string>automatic</string>"));
        assert!(xml.contains("<integer>2</integer>"));
        assert!(xml.ends_with("</dict>\n</plist>\n"));
    }

    #[test]
    fn escapes_markup_in_strings() {
        let bundle = Bundle::from_settings(vec![
            Setting::new("HomepageLocation", Value::Str("a<b>&\"c'".into())).unwrap(),
        ])
        .unwrap();
        let xml = render(&bundle);
        assert!(xml.contains("<string>a&lt;b&gt;&amp;&quot;c&apos;</string>"));
    }

    #[test]
    fn empty_bundle_is_empty_dict() {
        let xml = render(&Bundle::new());
        assert!(xml.contains("<dict>\n</dict>"));
    }

    #[test]
    fn launch_agent_lists_arguments() {
        let doc = launch_agent(
            "com.bravetune.reapply",
            &["/usr/local/bin/bravetune".into(), "--beta".into(), "reapply".into()],
            Path::new("/Users/me/.config/bravetune/reapply.log"),
        );
        assert!(doc.contains("<string>com.bravetune.reapply</string>"));
        assert!(doc.contains(
            "\t\t<string>/usr/local/bin/bravetune</string>\n\t\t<string>--beta</string>\n\t\t<string>reapply</string>\n"
        ));
        assert!(doc.contains("<key>RunAtLoad</key>\n\t<true/>"));
        assert_eq!(doc.matches("reapply.log</string>").count(), 2);
    }
}
