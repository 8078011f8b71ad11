//! Decoded AndroidManifest.xml reader
//!
//! Only component declarations are extracted. Binary (AXML) manifests must be
//! decoded before they reach this module.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::component::{Component, ComponentKind, PackageComponents};
use crate::error::ComponentError;
use crate::Result;

pub fn parse_manifest(xml: &str) -> Result<PackageComponents> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut package_name: Option<String> = None;
    let mut application_enabled = true;
    let mut declared: Vec<(ComponentKind, String, Option<bool>, Option<bool>)> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ComponentError::Manifest(e.to_string()))?;

        match event {
            Event::Start(start) | Event::Empty(start) => {
                let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                match tag.as_str() {
                    "manifest" => {
                        package_name = attribute(&start, "package")?;
                    }
                    "application" => {
                        if let Some(enabled) = attribute(&start, "enabled")? {
                            application_enabled = parse_bool(&enabled);
                        }
                    }
                    _ => {
                        // activity-alias and friends fail to parse and are skipped
                        if let Ok(kind) = tag.parse::<ComponentKind>() {
                            match attribute(&start, "name")? {
                                Some(name) => {
                                    let exported =
                                        attribute(&start, "exported")?.map(|v| parse_bool(&v));
                                    let enabled =
                                        attribute(&start, "enabled")?.map(|v| parse_bool(&v));
                                    declared.push((kind, name, exported, enabled));
                                }
                                None => {
                                    tracing::warn!(kind = %kind, "Component declaration without a name");
                                }
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let package_name = package_name.ok_or_else(|| {
        ComponentError::Manifest("manifest has no package attribute".to_string())
    })?;

    let components = declared
        .into_iter()
        .map(|(kind, name, exported, enabled)| Component {
            kind,
            name: qualify_class_name(&package_name, &name),
            exported: exported.unwrap_or(false),
            enabled: application_enabled && enabled.unwrap_or(true),
        })
        .collect();

    Ok(PackageComponents {
        package_name,
        components,
    })
}

/// Value of the attribute whose local name is `name`, ignoring its namespace prefix
fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ComponentError::Manifest(e.to_string()))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| ComponentError::Manifest(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// `.Foo` and `Foo` are relative to the manifest package
fn qualify_class_name(package: &str, name: &str) -> String {
    if name.starts_with('.') {
        format!("{}{}", package, name)
    } else if !name.contains('.') {
        format!("{}.{}", package, name)
    } else {
        name.to_string()
    }
}
