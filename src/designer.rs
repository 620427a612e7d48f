//! Designer 代码生成模块
//!
//! 在文档成功写入之后，为资源集合生成强类型访问类（`<Name>.Designer.cs`）。
//!
//! # 规则
//! - `Ns.Class.resx` → 命名空间 `Ns`、类名 `Class`；否则命名空间为 `Resources`、类名为文件名
//! - 已存在的 Designer 文件中的命名空间优先
//! - 访问级别取自项目文件中该资源的 `Generator` 元数据：
//!   `PublicResXFileCodeGenerator` → public，`ResXFileCodeGenerator` → internal，默认 public
//! - 属性名由键转换而来：非法字符替换为 `_`，C# 关键字加 `@` 前缀，
//!   与已有成员重名时追加 `_2`、`_3` ...

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::escape::partial_escape;
use regex::Regex;

use crate::resource::ResourceSet;
use crate::utils::{to_identifier, ResxError};

/// 生成类的访问级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessLevel {
    #[default]
    Public,
    Internal,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Internal => "internal",
        }
    }
}

/// 生成类的命名信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignerClass {
    pub namespace: String,
    pub class_name: String,
    pub access: AccessLevel,
}

impl DesignerClass {
    /// 从 .resx 文件名推导命名空间与类名
    pub fn from_resx_path(resx_path: &Path, access: AccessLevel) -> Self {
        let file_name = resx_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Resources");

        let (namespace, class_name) = match file_name.split_once('.') {
            Some((namespace, rest)) => {
                let class_name = rest.split('.').next().unwrap_or(rest);
                (namespace.to_string(), class_name.to_string())
            }
            None => ("Resources".to_string(), file_name.to_string()),
        };

        Self {
            namespace,
            class_name: to_identifier(&class_name),
            access,
        }
    }
}

/// C# 保留关键字
const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class", "const",
    "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event", "explicit", "extern",
    "false", "finally", "fixed", "float", "for", "foreach", "goto", "if", "implicit", "in", "int", "interface",
    "internal", "is", "lock", "long", "namespace", "new", "null", "object", "operator", "out", "override",
    "params", "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true", "try", "typeof",
    "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

/// 为每个资源分配唯一的属性名（与资源顺序一致）
///
/// 类名与生成类自带的成员（`ResourceManager`、`Culture` 及其字段）也视为已占用。
pub fn property_names(class_name: &str, resources: &ResourceSet) -> Vec<String> {
    let mut taken: HashSet<String> = [class_name, "ResourceManager", "Culture", "resourceMan", "resourceCulture"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    resources
        .iter()
        .map(|entry| {
            let base = to_identifier(&entry.key);
            let mut candidate = base.clone();
            let mut suffix = 2;
            while taken.contains(&candidate) {
                candidate = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            if candidate != base {
                tracing::warn!(key = %entry.key, property = %candidate, "property name already in use, renamed");
            }
            taken.insert(candidate.clone());

            if CSHARP_KEYWORDS.contains(&candidate.as_str()) {
                format!("@{}", candidate)
            } else {
                candidate
            }
        })
        .collect()
}

/// 转义为 C# 字符串字面量内容
fn escape_csharp_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// 生成 Designer.cs 源码
pub fn generate_designer_code(class: &DesignerClass, resources: &ResourceSet) -> String {
    let access = class.access.as_str();
    let name = &class.class_name;
    let namespace = &class.namespace;
    let mut code = String::new();

    code.push_str(
        "//------------------------------------------------------------------------------\n\
         // <auto-generated>\n\
         //     This code was generated by a tool.\n\
         //     Runtime Version:4.0.30319.42000\n\
         //\n\
         //     Changes to this file may cause incorrect behavior and will be lost if\n\
         //     the code is regenerated.\n\
         // </auto-generated>\n\
         //------------------------------------------------------------------------------\n\n",
    );

    code.push_str(&format!(
        r#"namespace {namespace} {{
    using System;

    /// <summary>
    ///   A strongly-typed resource class, for looking up localized strings, etc.
    /// </summary>
    [global::System.CodeDom.Compiler.GeneratedCodeAttribute("VS Code RESX Editor", "1.0.0.0")]
    [global::System.Diagnostics.DebuggerNonUserCodeAttribute()]
    [global::System.Runtime.CompilerServices.CompilerGeneratedAttribute()]
    {access} class {name} {{

        private static global::System.Resources.ResourceManager resourceMan;

        private static global::System.Globalization.CultureInfo resourceCulture;

        [global::System.Diagnostics.CodeAnalysis.SuppressMessageAttribute("Microsoft.Performance", "CA1811:AvoidUncalledPrivateCode")]
        internal {name}() {{
        }}

        /// <summary>
        ///   Returns the cached ResourceManager instance used by this class.
        /// </summary>
        [global::System.ComponentModel.EditorBrowsableAttribute(global::System.ComponentModel.EditorBrowsableState.Advanced)]
        {access} static global::System.Resources.ResourceManager ResourceManager {{
            get {{
                if (object.ReferenceEquals(resourceMan, null)) {{
                    global::System.Resources.ResourceManager temp = new global::System.Resources.ResourceManager("{namespace}.{name}", typeof({name}).Assembly);
                    resourceMan = temp;
                }}
                return resourceMan;
            }}
        }}

        /// <summary>
        ///   Overrides the current thread's CurrentUICulture property for all
        ///   resource lookups using this strongly typed resource class.
        /// </summary>
        [global::System.ComponentModel.EditorBrowsableAttribute(global::System.ComponentModel.EditorBrowsableState.Advanced)]
        {access} static global::System.Globalization.CultureInfo Culture {{
            get {{
                return resourceCulture;
            }}
            set {{
                resourceCulture = value;
            }}
        }}

"#
    ));

    for (entry, property) in resources.iter().zip(property_names(name, resources)) {
        if entry.has_comment() {
            code.push_str("        /// <summary>\n");
            for line in entry.comment.lines() {
                code.push_str(&format!("        ///   {}\n", partial_escape(line)));
            }
            code.push_str("        /// </summary>\n");
        }

        code.push_str(&format!(
            r#"        {access} static string {property} {{
            get {{
                return ResourceManager.GetString("{key}", resourceCulture);
            }}
        }}

"#,
            key = escape_csharp_string(&entry.key),
        ));
    }

    code.push_str("    }\n}");
    code
}

/// 在项目文件文本中查找该资源的 Generator 元数据
pub fn detect_access_level(project_text: &str, resx_file_name: &str) -> Option<AccessLevel> {
    let item = Regex::new(&format!(
        r#"(?is)<EmbeddedResource\s+(?:Include|Update)=["'](?:[^"']*[\\/])?{}["'][^>]*>(.*?)</EmbeddedResource>"#,
        regex::escape(resx_file_name)
    ))
    .ok()?;
    let generator = Regex::new(r"(?i)<Generator>\s*([^<]+?)\s*</Generator>").ok()?;

    let body = item.captures(project_text)?.get(1)?.as_str();
    let name = generator.captures(body)?.get(1)?.as_str();

    match name {
        "PublicResXFileCodeGenerator" => Some(AccessLevel::Public),
        "ResXFileCodeGenerator" => Some(AccessLevel::Internal),
        _ => None,
    }
}

/// 从 .resx 所在目录向上查找项目文件，推断访问级别
pub fn find_access_level(resx_path: &Path) -> AccessLevel {
    let Some(file_name) = resx_path.file_name().and_then(|s| s.to_str()) else {
        return AccessLevel::default();
    };

    for dir in resx_path.ancestors().skip(1) {
        let Ok(entries) = fs::read_dir(if dir.as_os_str().is_empty() { Path::new(".") } else { dir }) else {
            continue;
        };

        let projects: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("csproj"))
            .collect();

        if projects.is_empty() {
            continue;
        }

        for project in &projects {
            match fs::read_to_string(project) {
                Ok(text) => {
                    if let Some(level) = detect_access_level(&text, file_name) {
                        return level;
                    }
                }
                Err(e) => tracing::error!(project = %project.display(), "error reading project file: {}", e),
            }
        }

        // 最近的项目目录决定结果
        break;
    }

    AccessLevel::default()
}

/// 读取已存在 Designer 文件中的命名空间
pub fn existing_namespace(designer_text: &str) -> Option<String> {
    let re = Regex::new(r"namespace\s+([^\s{;]+)").ok()?;
    Some(re.captures(designer_text)?.get(1)?.as_str().to_string())
}

/// `Strings.resx` → `Strings.Designer.cs`
pub fn designer_path(resx_path: &Path) -> PathBuf {
    resx_path.with_extension("Designer.cs")
}

/// 访问类生成器 trait
///
/// 只在文档写入成功之后调用。
pub trait AccessorEmitter {
    /// 为资源集合生成访问类
    ///
    /// # 返回
    /// 返回生成文件的路径
    fn emit(&self, resources: &ResourceSet) -> Result<PathBuf, ResxError>;
}

/// 写入 `<Name>.Designer.cs` 的默认生成器
#[derive(Debug, Clone)]
pub struct DesignerFileEmitter {
    resx_path: PathBuf,
    access: Option<AccessLevel>,
}

impl DesignerFileEmitter {
    pub fn new(resx_path: impl Into<PathBuf>) -> Self {
        Self {
            resx_path: resx_path.into(),
            access: None,
        }
    }

    /// 固定访问级别，不再查找项目文件
    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = Some(access);
        self
    }
}

impl AccessorEmitter for DesignerFileEmitter {
    fn emit(&self, resources: &ResourceSet) -> Result<PathBuf, ResxError> {
        let access = self
            .access
            .unwrap_or_else(|| find_access_level(&self.resx_path));
        let mut class = DesignerClass::from_resx_path(&self.resx_path, access);

        let path = designer_path(&self.resx_path);
        if path.exists() {
            if let Some(namespace) = fs::read_to_string(&path).ok().as_deref().and_then(existing_namespace) {
                class.namespace = namespace;
            }
            tracing::info!("Updating existing Designer file at {}", path.display());
        } else {
            tracing::info!("Creating new Designer file at {}", path.display());
        }

        fs::write(&path, generate_designer_code(&class, resources))?;
        Ok(path)
    }
}
