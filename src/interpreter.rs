use crate::builtin::{self, Context};
use crate::editor::{LineEditor, Scan};
use crate::env::Environment;
use crate::error::ShellError;
use crate::expr;
use crate::external::{self, DispatchPolicy, LaunchEnv, Launcher, SystemLauncher};
use crate::interrupt::{self, InterruptState};
use crate::io_adapters::OutputSink;
use crate::keyword::Keyword;
use crate::lexer;
use crate::parser::{self, Arg, KeywordArgs, Statement, Template};
use crate::platform::{
    Console, CrosstermTerminal, NativeSystemInfo, Privilege, PrivilegeControl, ProcessPrivileges,
    SystemInfo, TerminalIO,
};
use crate::style::{self, GREEN, PURPLE, RED};
use crate::value::Value;
use std::io::{self, Write};

/// Runs lines of shell input against one [`Environment`].
///
/// Every platform effect goes through a replaceable capability, so the
/// interpreter can be driven entirely in memory:
///
/// ```
/// use pangsh::{Environment, Interpreter, MemWriter};
/// use std::collections::HashMap;
///
/// let output = MemWriter::new();
/// let mut sh = Interpreter::new(Environment::with_vars(HashMap::new()))
///     .with_output(Box::new(output.clone()));
/// sh.run_line("a = 5 * (10 + 20); echo $a").unwrap();
/// assert_eq!(output.contents(), "150\n");
/// ```
pub struct Interpreter {
    env: Environment,
    out: OutputSink,
    console: Box<dyn Console>,
    privileges: Box<dyn PrivilegeControl>,
    launcher: Box<dyn Launcher>,
    system: Box<dyn SystemInfo>,
    policy: DispatchPolicy,
    interrupts: &'static InterruptState,
    launch_args: Vec<String>,
}

impl Interpreter {
    /// An interpreter wired to the real terminal and operating system.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            out: OutputSink::stdout(),
            console: Box::new(CrosstermTerminal),
            privileges: Box::new(ProcessPrivileges),
            launcher: Box::new(SystemLauncher),
            system: Box::new(NativeSystemInfo),
            policy: DispatchPolicy::native(),
            interrupts: &interrupt::GLOBAL,
            launch_args: Vec::new(),
        }
    }

    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = OutputSink::new(out);
        self
    }

    pub fn with_console(mut self, console: Box<dyn Console>) -> Self {
        self.console = console;
        self
    }

    pub fn with_privileges(mut self, privileges: Box<dyn PrivilegeControl>) -> Self {
        self.privileges = privileges;
        self
    }

    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_system_info(mut self, system: Box<dyn SystemInfo>) -> Self {
        self.system = system;
        self
    }

    pub fn with_dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_interrupts(mut self, interrupts: &'static InterruptState) -> Self {
        self.interrupts = interrupts;
        self
    }

    /// Arguments passed again to the shell when it reloads itself.
    pub fn with_launch_args(mut self, args: Vec<String>) -> Self {
        self.launch_args = args;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Lexes, parses and executes one line.
    ///
    /// Statements run in order; the first error stops the line and is
    /// returned, while the effects of earlier statements stay.
    pub fn run_line(&mut self, line: &str) -> Result<(), ShellError> {
        let tokens = lexer::tokenize(line)?;
        let statements = parser::construct_ast(tokens)?;

        for statement in &statements {
            let _running = self.interrupts.enter();
            self.execute(statement)?;
            self.interrupts.check()?;
            if self.env.should_exit {
                break;
            }
        }
        Ok(())
    }

    /// Runs every line of `source`, reporting errors per line.
    pub fn run_script_source(&mut self, source: &str) {
        for line in source.lines() {
            if let Err(err) = self.run_line(line) {
                self.report_error(&err);
            }
            if self.env.should_exit {
                break;
            }
        }
    }

    /// Prompts, reads and runs lines until `exit` or end of input.
    pub fn repl(&mut self, editor: &mut LineEditor, terminal: &mut dyn TerminalIO) -> io::Result<()> {
        while !self.env.should_exit {
            terminal.write_str(&self.prompt())?;
            terminal.flush()?;

            match editor.scan(terminal)? {
                Scan::Line(line) => {
                    if let Err(err) = self.run_line(&line) {
                        self.report_error(&err);
                    }
                }
                Scan::Interrupted => {}
                Scan::Eof => break,
            }
        }
        Ok(())
    }

    /// `<cwd>$ ` with the home directory abbreviated.
    pub fn prompt(&self) -> String {
        let cwd = style::format_path(&self.env.current_dir, self.env.home_dir().as_deref());
        format!("{}{}", style::paint(&cwd, PURPLE), style::paint("$ ", GREEN))
    }

    /// Prints `err` in red, bypassing `@echo off`.
    pub fn report_error(&mut self, err: &ShellError) {
        tracing::debug!(error = ?err, "statement failed");
        let text = match err {
            ShellError::Interrupted => "\n".to_string(),
            other => format!("{}\n", style::paint(&other.to_string(), RED)),
        };
        let out = self.out.raw();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "could not report error");
        }
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), ShellError> {
        match statement {
            Statement::Assign {
                name,
                expr,
                referenced_vars,
            } => {
                let values = self.lookup(referenced_vars)?;
                let value = expr::evaluate(expr, &values)?;
                tracing::debug!(%name, ?value, "assigned");
                self.env.set_var(name.clone(), value);
                Ok(())
            }
            Statement::Keyword {
                keyword,
                args,
                referenced_vars,
                elevated,
            } => {
                if *elevated {
                    self.with_elevation(|sh| sh.run_keyword(*keyword, args, referenced_vars))
                } else {
                    self.run_keyword(*keyword, args, referenced_vars)
                }
            }
            Statement::Program {
                args,
                referenced_vars,
                elevated,
            } => {
                let argv = self.resolve_args(args, referenced_vars)?;
                if *elevated {
                    self.run_elevated_program(argv)
                } else {
                    self.run_program(&argv)
                }
            }
        }
    }

    /// Raises privileges around `f` and restores the previous level afterwards,
    /// whatever `f` returned.
    fn with_elevation<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ShellError>,
    ) -> Result<T, ShellError> {
        let previous = self.privileges.current();
        self.privileges.set(Privilege::Elevated)?;
        let result = f(self);
        let restored = self.privileges.set(previous);
        let value = result?;
        restored?;
        Ok(value)
    }

    fn run_elevated_program(&mut self, argv: Vec<String>) -> Result<(), ShellError> {
        match self.with_elevation(|sh| sh.run_program(&argv)) {
            Err(ShellError::ElevationDenied(reason)) => match self.policy.elevation_wrapper.clone() {
                Some(wrapper) => {
                    tracing::debug!(%reason, %wrapper, "cannot elevate in-process, wrapping program");
                    let mut wrapped = vec![wrapper];
                    wrapped.extend(argv);
                    self.run_program(&wrapped)
                }
                None => Err(ShellError::ElevationDenied(reason)),
            },
            other => other,
        }
    }

    fn run_keyword(
        &mut self,
        keyword: Keyword,
        args: &KeywordArgs,
        referenced_vars: &[String],
    ) -> Result<(), ShellError> {
        enum Input {
            Value(Value),
            Words(Vec<String>),
            Nothing,
        }

        let input = match args {
            KeywordArgs::Expr(template) => Input::Value(self.evaluate(template, referenced_vars)?),
            KeywordArgs::List(list) => Input::Words(self.resolve_args(list, referenced_vars)?),
            KeywordArgs::None => Input::Nothing,
        };

        let mut ctx = Context {
            env: &mut self.env,
            out: &mut self.out,
            console: &mut *self.console,
            system: &*self.system,
            interrupts: self.interrupts,
            launch_args: &self.launch_args,
        };
        let result = match input {
            Input::Value(value) => builtin::run_scalar(keyword, value, &mut ctx),
            Input::Words(words) => builtin::run_list(keyword, &words, &mut ctx),
            Input::Nothing => builtin::run_bare(keyword, &mut ctx),
        };
        ctx.out.flush()?;
        result
    }

    /// An empty template (`echo`, `cd`) evaluates to the empty string.
    fn evaluate(&self, template: &Template, referenced_vars: &[String]) -> Result<Value, ShellError> {
        if template.is_blank() {
            return Ok(Value::Str(String::new()));
        }
        let values = self.lookup(referenced_vars)?;
        Ok(expr::evaluate(template, &values)?)
    }

    fn run_program(&mut self, argv: &[String]) -> Result<(), ShellError> {
        self.out.flush()?;
        let vars = self.env.process_vars();
        let launch_env = LaunchEnv {
            vars: &vars,
            current_dir: &self.env.current_dir,
        };
        external::dispatch(&mut *self.launcher, &self.policy, argv, &launch_env)?;
        Ok(())
    }

    fn lookup(&self, names: &[String]) -> Result<Vec<Value>, ShellError> {
        names
            .iter()
            .map(|name| {
                self.env
                    .get_var(name)
                    .cloned()
                    .ok_or_else(|| ShellError::UndefinedVariable(name.clone()))
            })
            .collect()
    }

    /// Arguments with placeholders replaced by the text of their variables.
    fn resolve_args(&self, args: &[Arg], referenced_vars: &[String]) -> Result<Vec<String>, ShellError> {
        let mut values = self.lookup(referenced_vars)?.into_iter();
        args.iter()
            .map(|arg| match arg {
                Arg::Literal(word) => Ok(word.clone()),
                Arg::Placeholder => values
                    .next()
                    .map(|v| v.to_string())
                    .ok_or_else(|| ShellError::InvalidArgument("missing value for placeholder".to_string())),
            })
            .collect()
    }
}
