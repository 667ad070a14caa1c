// ============================================
// Manifest - Описание модуля и цели сборки
// ============================================
// Данные для хоста-движка: только описание, ничего не загружается

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Тип цели сборки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Editor,
    Game,
}

/// Описание модуля: зависимости и пути заголовков
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub public_dependencies: Vec<String>,
    pub private_dependencies: Vec<String>,
    pub private_include_modules: Vec<String>,
    /// Пути относительно корня движка
    pub public_include_paths: Vec<String>,
    pub private_include_paths: Vec<String>,
}

/// Цель сборки и модули, которые она подключает
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub name: String,
    pub kind: TargetKind,
    pub extra_modules: Vec<String>,
}

/// Добавить имена без повторов, порядок первого появления
fn extend_unique(list: &mut Vec<String>, names: &[&str]) {
    for name in names {
        if !list.iter().any(|n| n == name) {
            list.push((*name).to_string());
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_dependencies: Vec::new(),
            private_dependencies: Vec::new(),
            private_include_modules: Vec::new(),
            public_include_paths: Vec::new(),
            private_include_paths: Vec::new(),
        }
    }

    /// Публичные и приватные зависимости без повторов
    pub fn all_dependencies(&self) -> Vec<String> {
        let mut all = self.public_dependencies.clone();
        for name in &self.private_dependencies {
            if !all.contains(name) {
                all.push(name.clone());
            }
        }
        all
    }

    pub fn depends_on(&self, module: &str) -> bool {
        self.public_dependencies.iter().chain(&self.private_dependencies).any(|n| n == module)
    }

    /// Пути заголовков относительно корня движка
    pub fn resolve_include_paths(&self, engine_root: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let resolve = |paths: &[String]| -> Vec<PathBuf> { paths.iter().map(|p| engine_root.join(p)).collect() };
        (resolve(&self.public_include_paths), resolve(&self.private_include_paths))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TargetDescriptor {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Модуль ландшафта
pub fn cyland_module() -> ModuleDescriptor {
    let mut module = ModuleDescriptor::new("CyLand");

    module.public_include_paths = strings(&[
        "Engine/Source/Runtime/Engine/Public",
        "Engine/Source/ThirdParty/PhysX3/PxShared/include/foundation",
        "Engine/Source/ThirdParty/PhysX3/PxShared/include/pvd",
        "Engine/Source/ThirdParty/PhysX3/PxShared/include",
        "Engine/Source/ThirdParty/PhysX3/PhysX_3.4/Include",
        "Engine/Source/ThirdParty/PhysX3/PhysX_3.4/Include/common",
        "Engine/Source/ThirdParty/PhysX3/PhysX_3.4/Include/extensions",
        "Engine/Source/ThirdParty/PhysX3/PhysX_3.4/Include/geometry",
        "Engine/Source/ThirdParty/PhysX3/APEX_1.4/include",
        "Engine/Source/ThirdParty/PhysX3/APEX_1.4/include/PhysX3",
        "Engine/Source/ThirdParty/PhysX3/APEX_1.4/include/clothing",
        "Engine/Source/ThirdParty/PhysX3/APEX_1.4/include/legacy",
        "Engine/Source/ThirdParty/PhysX3/APEX_1.4/include/nvparameterized",
        "Engine/Source/ThirdParty/PhysX3/APEX_1.4/shared/general/RenderDebug/public",
    ]);
    module.private_include_paths = strings(&[
        "Engine/Source/Runtime/Engine/Private",
        "CyLand/Private",
        "Engine/Source/Editor/UnrealEd/Private",
    ]);

    extend_unique(
        &mut module.private_include_modules,
        &["TargetPlatform", "DerivedDataCache", "Foliage", "Renderer", "UnrealEd", "CyLandEditor"],
    );
    extend_unique(
        &mut module.public_dependencies,
        &["Core", "CoreUObject", "Engine", "Foliage", "InputCore", "SwarmInterface"],
    );
    extend_unique(
        &mut module.private_dependencies,
        &[
            "MaterialUtilities", "SlateCore", "Slate", "Core", "CoreUObject",
            "ApplicationCore", "Engine", "RenderCore", "RHI", "Renderer",
        ],
    );
    extend_unique(&mut module.private_dependencies, &["MeshDescription", "MeshUtilitiesCommon"]);
    extend_unique(&mut module.private_dependencies, &["UnrealEd", "MaterialUtilities", "SlateCore", "Slate"]);

    module
}

/// Цель редактора с модулями ландшафта
pub fn editor_target() -> TargetDescriptor {
    TargetDescriptor {
        name: "worldengine2Editor".into(),
        kind: TargetKind::Editor,
        extra_modules: strings(&["worldengine2", "CyLand", "CyLandEditor"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyland_dependencies() {
        let module = cyland_module();
        assert_eq!(module.public_dependencies.len(), 6);
        // Повторы из нескольких списков схлопываются
        assert_eq!(module.private_dependencies.len(), 13);
        assert!(module.depends_on("RHI"));
        assert!(module.depends_on("SwarmInterface"));
        assert!(!module.depends_on("CyLandEditor"));
        assert!(module.private_include_modules.contains(&"CyLandEditor".to_string()));

        let all = module.all_dependencies();
        assert_eq!(all.len(), 16);
        assert_eq!(all[0], "Core");
        assert!(all.contains(&"MeshUtilitiesCommon".to_string()));
    }

    #[test]
    fn test_editor_target() {
        let target = editor_target();
        assert_eq!(target.kind, TargetKind::Editor);
        assert_eq!(target.extra_modules, vec!["worldengine2", "CyLand", "CyLandEditor"]);
        assert!(target.to_json().unwrap().contains("\"Editor\""));
    }

    #[test]
    fn test_json_roundtrip_and_paths() {
        let module = cyland_module();
        let parsed = ModuleDescriptor::from_json(&module.to_json().unwrap()).unwrap();
        assert_eq!(parsed, module);

        let (public, private) = module.resolve_include_paths(Path::new("/opt/engine"));
        assert_eq!(public.len(), 14);
        assert_eq!(private[1], Path::new("/opt/engine/CyLand/Private"));
    }
}
