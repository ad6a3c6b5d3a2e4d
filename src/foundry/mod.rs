// src/foundry/mod.rs
// The tool registry: a static table of tool specs (name, LLM-facing
// description, JSON parameter schema, action) built once at process start.

pub mod actions;
pub mod context;
pub mod runner;

use std::collections::HashMap;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

pub use context::ToolContext;
pub use runner::ToolRunner;

/// A tool invocation emitted by the LLM.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Invocation {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Which concrete action a tool spec dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    // File system
    WriteFile,
    AppendToFile,
    ReadFile,
    ListFiles,
    CreateDirectory,
    CreatePackageInit,
    DeleteDirectory,
    DeleteFile,
    CopyFile,
    MoveFile,
    // Structure edits
    AddClassToFile,
    AddFunctionToFile,
    AddMethodToClass,
    AddParameterToFunction,
    AddDecoratorToFunction,
    AppendToFunction,
    ReplaceNodeInFile,
    ReplaceMethodInClass,
    RenameSymbolInFile,
    AddImport,
    AddAttributeToInit,
    // Code intelligence
    FindDefinition,
    FindReferences,
    GetDependencies,
    RenameSymbol,
    ListFunctionsInFile,
    GetCodeFor,
    // Quality and processes
    LintFile,
    RunTests,
    RunShellCommand,
    // Dependencies
    AddDependencyToRequirements,
    PipInstall,
    // Context
    IndexProjectContext,
    // Mission log
    AddTaskToMissionLog,
    MarkTaskAsDone,
    GetMissionLog,
}

impl ToolAction {
    pub async fn invoke(&self, ctx: &ToolContext, args: Value) -> Result<Value> {
        use actions::*;
        match self {
            ToolAction::WriteFile => file_ops::write_file(ctx, args).await,
            ToolAction::AppendToFile => file_ops::append_to_file(ctx, args).await,
            ToolAction::ReadFile => file_ops::read_file(ctx, args).await,
            ToolAction::ListFiles => file_ops::list_files(ctx, args).await,
            ToolAction::CreateDirectory => file_ops::create_directory(ctx, args).await,
            ToolAction::CreatePackageInit => file_ops::create_package_init(ctx, args).await,
            ToolAction::DeleteDirectory => file_ops::delete_directory(ctx, args).await,
            ToolAction::DeleteFile => file_ops::delete_file(ctx, args).await,
            ToolAction::CopyFile => file_ops::copy_file(ctx, args).await,
            ToolAction::MoveFile => file_ops::move_file(ctx, args).await,
            ToolAction::AddClassToFile => code_edit::add_class_to_file(ctx, args).await,
            ToolAction::AddFunctionToFile => code_edit::add_function_to_file(ctx, args).await,
            ToolAction::AddMethodToClass => code_edit::add_method_to_class(ctx, args).await,
            ToolAction::AddParameterToFunction => {
                code_edit::add_parameter_to_function(ctx, args).await
            }
            ToolAction::AddDecoratorToFunction => {
                code_edit::add_decorator_to_function(ctx, args).await
            }
            ToolAction::AppendToFunction => code_edit::append_to_function(ctx, args).await,
            ToolAction::ReplaceNodeInFile => code_edit::replace_node_in_file(ctx, args).await,
            ToolAction::ReplaceMethodInClass => code_edit::replace_method_in_class(ctx, args).await,
            ToolAction::RenameSymbolInFile => code_edit::rename_symbol_in_file(ctx, args).await,
            ToolAction::AddImport => code_edit::add_import(ctx, args).await,
            ToolAction::AddAttributeToInit => code_edit::add_attribute_to_init(ctx, args).await,
            ToolAction::FindDefinition => code_intel::find_definition(ctx, args).await,
            ToolAction::FindReferences => code_intel::find_references(ctx, args).await,
            ToolAction::GetDependencies => code_intel::get_dependencies(ctx, args).await,
            ToolAction::RenameSymbol => code_intel::rename_symbol(ctx, args).await,
            ToolAction::ListFunctionsInFile => code_intel::list_functions_in_file(ctx, args).await,
            ToolAction::GetCodeFor => code_intel::get_code_for(ctx, args).await,
            ToolAction::LintFile => shell::lint_file(ctx, args).await,
            ToolAction::RunTests => shell::run_tests(ctx, args).await,
            ToolAction::RunShellCommand => shell::run_shell_command(ctx, args).await,
            ToolAction::AddDependencyToRequirements => {
                deps::add_dependency_to_requirements(ctx, args).await
            }
            ToolAction::PipInstall => deps::pip_install(ctx, args).await,
            ToolAction::IndexProjectContext => rag::index_project_context(ctx, args).await,
            ToolAction::AddTaskToMissionLog => mission_log::add_task_to_mission_log(ctx, args).await,
            ToolAction::MarkTaskAsDone => mission_log::mark_task_as_done(ctx, args).await,
            ToolAction::GetMissionLog => mission_log::get_mission_log(ctx, args).await,
        }
    }
}

/// A registered tool: stable id, LLM-facing description, JSON-Schema
/// parameter description and the action it runs.
pub struct ToolSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub parameters: Value,
    pub action: ToolAction,
    /// Tools whose success changes the workspace tree; they trigger a
    /// `file_tree_updated` broadcast.
    pub filesystem: bool,
    /// Tools that can rewrite file contents; their path arguments are
    /// snapshotted for the polish-pass diff.
    pub mutating: bool,
}

pub struct Foundry {
    specs: HashMap<&'static str, ToolSpec>,
}

impl Foundry {
    pub fn with_builtin_tools() -> Self {
        let mut specs = HashMap::new();
        for spec in builtin_specs() {
            specs.insert(spec.id, spec);
        }
        info!("Foundry initialized with {} tools", specs.len());
        Self { specs }
    }

    pub fn get(&self, id: &str) -> Option<&ToolSpec> {
        self.specs.get(id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Tool definitions in the generic shape handed to the LLM.
    pub fn tool_definitions(&self) -> Value {
        let mut specs: Vec<&ToolSpec> = self.specs.values().collect();
        specs.sort_by_key(|spec| spec.id);
        Value::Array(
            specs
                .into_iter()
                .map(|spec| {
                    json!({
                        "name": spec.id,
                        "description": spec.description,
                        "parameters": spec.parameters,
                    })
                })
                .collect(),
        )
    }
}

fn path_param(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn builtin_specs() -> Vec<ToolSpec> {
    vec![
        // ------------------------------------------------------------------
        // File system
        // ------------------------------------------------------------------
        ToolSpec {
            id: "write_file",
            description: "The primary tool for writing files. It can write pre-defined content directly, or it can generate code via an AI if a `task_description` is provided instead of `content`. It creates directories if needed and overwrites the file if it exists.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The path of the file to write to."),
                    "content": {"type": "string", "description": "The content to write into the file. Use this for pre-defined content. If you use this, do not use `task_description`."},
                    "task_description": {"type": "string", "description": "A detailed, clear, and specific description of the code to be generated for the file. Use this ONLY when you want the AI to generate code. If used, `content` should be empty."}
                },
                "required": ["path"]
            }),
            action: ToolAction::WriteFile,
            filesystem: true,
            mutating: true,
        },
        ToolSpec {
            id: "append_to_file",
            description: "Appends content to the end of an existing file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The path of the file to append to."),
                    "content": {"type": "string", "description": "The content to append."}
                },
                "required": ["path", "content"]
            }),
            action: ToolAction::AppendToFile,
            filesystem: true,
            mutating: true,
        },
        ToolSpec {
            id: "read_file",
            description: "Reads and returns the content of a specified file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The path of the file to read.")
                },
                "required": ["path"]
            }),
            action: ToolAction::ReadFile,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "list_files",
            description: "Lists files and directories at a given path inside the project.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The directory to list, relative to the project root. Defaults to the root.")
                },
                "required": []
            }),
            action: ToolAction::ListFiles,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "create_directory",
            description: "Creates a new, empty directory.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The path of the directory to create.")
                },
                "required": ["path"]
            }),
            action: ToolAction::CreateDirectory,
            filesystem: true,
            mutating: false,
        },
        ToolSpec {
            id: "create_package_init",
            description: "Initializes a directory as a Python package by creating an __init__.py file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The package directory to initialize.")
                },
                "required": ["path"]
            }),
            action: ToolAction::CreatePackageInit,
            filesystem: true,
            mutating: true,
        },
        ToolSpec {
            id: "delete_directory",
            description: "Recursively deletes a directory and all its contents.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The directory to delete.")
                },
                "required": ["path"]
            }),
            action: ToolAction::DeleteDirectory,
            filesystem: true,
            mutating: false,
        },
        ToolSpec {
            id: "delete_file",
            description: "Deletes a single file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The file to delete.")
                },
                "required": ["path"]
            }),
            action: ToolAction::DeleteFile,
            filesystem: true,
            mutating: true,
        },
        ToolSpec {
            id: "copy_file",
            description: "Copies a file from a source to a destination, creating destination directories as needed.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "source_path": path_param("The file to copy."),
                    "destination_path": path_param("Where to copy it to.")
                },
                "required": ["source_path", "destination_path"]
            }),
            action: ToolAction::CopyFile,
            filesystem: true,
            mutating: true,
        },
        ToolSpec {
            id: "move_file",
            description: "Moves a file from a source to a destination. Can be used to rename files.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "source_path": path_param("The file to move."),
                    "destination_path": path_param("Where to move it to.")
                },
                "required": ["source_path", "destination_path"]
            }),
            action: ToolAction::MoveFile,
            filesystem: true,
            mutating: true,
        },
        // ------------------------------------------------------------------
        // Structure edits
        // ------------------------------------------------------------------
        ToolSpec {
            id: "add_class_to_file",
            description: "Adds a complete class definition to a Python file. If a class with the same name exists, it is replaced. Creates the file when missing.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to modify."),
                    "class_code": {"type": "string", "description": "The complete source code of the class."}
                },
                "required": ["path", "class_code"]
            }),
            action: ToolAction::AddClassToFile,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "add_function_to_file",
            description: "Adds a complete function definition to a Python file. If a function with the same name exists, it is replaced. Creates the file when missing.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to modify."),
                    "function_code": {"type": "string", "description": "The complete source code of the function."}
                },
                "required": ["path", "function_code"]
            }),
            action: ToolAction::AddFunctionToFile,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "add_method_to_class",
            description: "Adds a new, empty method (with `pass`) to an existing class in a Python file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file containing the class."),
                    "class_name": {"type": "string", "description": "The class to add the method to."},
                    "name": {"type": "string", "description": "The name of the method to create (e.g., '__init__', 'my_method')."},
                    "args": {"type": "array", "items": {"type": "string"}, "description": "Argument names for the method. For instance methods, the first argument should always be 'self'."},
                    "is_async": {"type": "boolean", "description": "Set to true to create an 'async def' method. Defaults to false."}
                },
                "required": ["path", "class_name", "name", "args"]
            }),
            action: ToolAction::AddMethodToClass,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "add_parameter_to_function",
            description: "Adds a new parameter to a function's signature.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file containing the function."),
                    "function_name": {"type": "string", "description": "The function to modify."},
                    "parameter_name": {"type": "string", "description": "The name of the new parameter."},
                    "parameter_type": {"type": "string", "description": "Optional type annotation."},
                    "default_value": {"type": "string", "description": "Optional default value expression."}
                },
                "required": ["path", "function_name", "parameter_name"]
            }),
            action: ToolAction::AddParameterToFunction,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "add_decorator_to_function",
            description: "Adds a decorator to a specific function or method in a Python file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file containing the function."),
                    "function_name": {"type": "string", "description": "The function to decorate."},
                    "decorator_code": {"type": "string", "description": "The decorator, starting with '@' (e.g., \"@app.route('/')\")."}
                },
                "required": ["path", "function_name", "decorator_code"]
            }),
            action: ToolAction::AddDecoratorToFunction,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "append_to_function",
            description: "Appends code to the body of a specific function, before its final return statement.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file containing the function."),
                    "function_name": {"type": "string", "description": "The function to extend."},
                    "code_to_append": {"type": "string", "description": "The code to append to the function body."}
                },
                "required": ["path", "function_name", "code_to_append"]
            }),
            action: ToolAction::AppendToFunction,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "replace_node_in_file",
            description: "Replaces a top-level function or class in a file with new code carrying the same name.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to modify."),
                    "node_name": {"type": "string", "description": "The name of the function or class to replace."},
                    "new_code": {"type": "string", "description": "The complete replacement definition."}
                },
                "required": ["path", "node_name", "new_code"]
            }),
            action: ToolAction::ReplaceNodeInFile,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "replace_method_in_class",
            description: "Replaces a specific method within a class with new code.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file containing the class."),
                    "class_name": {"type": "string", "description": "The class containing the method."},
                    "method_name": {"type": "string", "description": "The method to replace."},
                    "new_code": {"type": "string", "description": "The complete replacement method definition."}
                },
                "required": ["path", "class_name", "method_name", "new_code"]
            }),
            action: ToolAction::ReplaceMethodInClass,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "rename_symbol_in_file",
            description: "Safely renames a symbol within a single Python file using a syntax-tree transform.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to modify."),
                    "old_name": {"type": "string", "description": "The current name."},
                    "new_name": {"type": "string", "description": "The new name."}
                },
                "required": ["path", "old_name", "new_name"]
            }),
            action: ToolAction::RenameSymbolInFile,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "add_import",
            description: "Adds an import statement to a Python file if an equivalent one does not already exist.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to modify."),
                    "module": {"type": "string", "description": "The module to import (e.g., 'os', 'fastapi')."},
                    "names": {"type": "array", "items": {"type": "string"}, "description": "Optional names for a 'from module import a, b' form."}
                },
                "required": ["path", "module"]
            }),
            action: ToolAction::AddImport,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "add_attribute_to_init",
            description: "Adds a 'self.attribute = value' assignment to a class's __init__, creating the method when it is missing.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file containing the class."),
                    "class_name": {"type": "string", "description": "The class to modify."},
                    "attribute_name": {"type": "string", "description": "The attribute name."},
                    "default_value": {"type": "string", "description": "The value expression to assign."}
                },
                "required": ["path", "class_name", "attribute_name", "default_value"]
            }),
            action: ToolAction::AddAttributeToInit,
            filesystem: false,
            mutating: true,
        },
        // ------------------------------------------------------------------
        // Code intelligence
        // ------------------------------------------------------------------
        ToolSpec {
            id: "find_definition",
            description: "Finds the definition of a function or class using the code intelligence index.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "symbol_name": {"type": "string", "description": "The symbol to look up."}
                },
                "required": ["symbol_name"]
            }),
            action: ToolAction::FindDefinition,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "find_references",
            description: "Finds all references (usages) of a function or class across the project.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "symbol_name": {"type": "string", "description": "The symbol to look up."}
                },
                "required": ["symbol_name"]
            }),
            action: ToolAction::FindReferences,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "get_dependencies",
            description: "Lists all functions and methods that a given symbol calls.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "symbol_name": {"type": "string", "description": "The symbol to inspect."}
                },
                "required": ["symbol_name"]
            }),
            action: ToolAction::GetDependencies,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "rename_symbol",
            description: "Performs a project-wide safe rename of a function or class and all of its usages using the code index. This is the most powerful refactoring tool for renaming.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "old_name": {"type": "string", "description": "The current name of the function or class to be renamed."},
                    "new_name": {"type": "string", "description": "The new name for the symbol."}
                },
                "required": ["old_name", "new_name"]
            }),
            action: ToolAction::RenameSymbol,
            filesystem: false,
            mutating: true,
        },
        ToolSpec {
            id: "list_functions_in_file",
            description: "Parses a Python file and returns a list of its top-level function names.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to inspect.")
                },
                "required": ["path"]
            }),
            action: ToolAction::ListFunctionsInFile,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "get_code_for",
            description: "Returns the full source code of a specific top-level function or class in a file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to inspect."),
                    "function_name": {"type": "string", "description": "The function or class name to retrieve."}
                },
                "required": ["path", "function_name"]
            }),
            action: ToolAction::GetCodeFor,
            filesystem: false,
            mutating: false,
        },
        // ------------------------------------------------------------------
        // Quality and processes
        // ------------------------------------------------------------------
        ToolSpec {
            id: "lint_file",
            description: "Checks a Python file for syntax errors and obvious style problems, returning the findings.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The Python file to lint.")
                },
                "required": ["path"]
            }),
            action: ToolAction::LintFile,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "run_tests",
            description: "Executes the project's test suite using pytest from within the project's virtual environment. It will automatically discover and run all tests. This should be the final step in any testing or QA plan.",
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            action: ToolAction::RunTests,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "run_shell_command",
            description: "Executes a short-lived shell command in the project root. 'python' and 'pip' are rewritten to the project's virtual environment executables when present. Do not start long-running processes.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "The command to execute."}
                },
                "required": ["command"]
            }),
            action: ToolAction::RunShellCommand,
            filesystem: false,
            mutating: false,
        },
        // ------------------------------------------------------------------
        // Dependencies
        // ------------------------------------------------------------------
        ToolSpec {
            id: "add_dependency_to_requirements",
            description: "Safely adds one or more dependencies to a requirements.txt file, skipping packages that are already listed.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The requirements file. Defaults to 'requirements.txt'."),
                    "dependencies": {"type": "array", "items": {"type": "string"}, "description": "Package specifiers to add (e.g., 'fastapi', 'requests==2.32.0')."}
                },
                "required": ["dependencies"]
            }),
            action: ToolAction::AddDependencyToRequirements,
            filesystem: true,
            mutating: true,
        },
        ToolSpec {
            id: "pip_install",
            description: "Installs dependencies from a requirements file using the project's virtual environment.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "requirements_path": path_param("The requirements file. Defaults to 'requirements.txt'.")
                },
                "required": []
            }),
            action: ToolAction::PipInstall,
            filesystem: false,
            mutating: false,
        },
        // ------------------------------------------------------------------
        // Context
        // ------------------------------------------------------------------
        ToolSpec {
            id: "index_project_context",
            description: "Scans a directory for Python files, extracts functions and classes, and adds them to the project's semantic code index.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": path_param("The path to scan, relative to the project root. Defaults to the root.")
                },
                "required": []
            }),
            action: ToolAction::IndexProjectContext,
            filesystem: false,
            mutating: false,
        },
        // ------------------------------------------------------------------
        // Mission log
        // ------------------------------------------------------------------
        ToolSpec {
            id: "add_task_to_mission_log",
            description: "Adds a new task to the project's shared to-do list (the Agent TODO).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "description": {"type": "string", "description": "The task to be added."},
                    "tool_call": {"type": "object", "description": "Optional pre-bound tool invocation for the task."}
                },
                "required": ["description"]
            }),
            action: ToolAction::AddTaskToMissionLog,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "mark_task_as_done",
            description: "Marks a task in the mission log as done.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "integer", "description": "The id of the task to mark done."}
                },
                "required": ["task_id"]
            }),
            action: ToolAction::MarkTaskAsDone,
            filesystem: false,
            mutating: false,
        },
        ToolSpec {
            id: "get_mission_log",
            description: "Retrieves the current mission log with the status of every task.",
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            action: ToolAction::GetMissionLog,
            filesystem: false,
            mutating: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_the_core_tools() {
        let foundry = Foundry::with_builtin_tools();
        for id in [
            "write_file",
            "rename_symbol",
            "run_tests",
            "add_dependency_to_requirements",
            "add_method_to_class",
            "index_project_context",
        ] {
            assert!(foundry.get(id).is_some(), "missing tool {}", id);
        }
        assert!(foundry.len() >= 35);
        assert!(foundry.get("unknown_tool").is_none());
    }

    #[test]
    fn definitions_are_sorted_and_complete() {
        let foundry = Foundry::with_builtin_tools();
        let defs = foundry.tool_definitions();
        let list = defs.as_array().unwrap();
        assert_eq!(list.len(), foundry.len());
        let names: Vec<&str> = list.iter().map(|d| d["name"].as_str().unwrap()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        for def in list {
            assert!(def["description"].as_str().unwrap().len() > 10);
            assert!(def["parameters"]["type"] == "object");
        }
    }
}
