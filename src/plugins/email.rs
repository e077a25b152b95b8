use crate::core::plugin::{KernelFunction, Plugin};
use crate::domain::model::ParameterView;
use crate::utils::error::PlannerError;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmailPluginFake;

impl Plugin for EmailPluginFake {
    fn functions(&self) -> Vec<KernelFunction> {
        vec![
            KernelFunction::native(
                "GetEmailAddress",
                "Given a name, find email address",
                |vars| Ok(format!("{}@example.com", vars.input().trim())),
            )
            .with_parameter(ParameterView::new(
                "input",
                "The name of the person to get an email address for",
            )),
            KernelFunction::native(
                "SendEmail",
                "Given an e-mail and message body, send an email",
                |vars| {
                    let address = vars.get("email_address").unwrap_or_default();
                    if address.trim().is_empty() {
                        return Err(PlannerError::FunctionInvocationError {
                            function: "SendEmail".to_string(),
                            message: "email_address is required".to_string(),
                        });
                    }
                    Ok(format!("Sent email to: {}. Body: {}", address, vars.input()))
                },
            )
            .with_parameter(ParameterView::new("input", "The body of the email message to send."))
            .with_parameter(ParameterView::new(
                "email_address",
                "The email address to send email to.",
            )),
            KernelFunction::native("WritePoem", "Write a short poem for an e-mail", |vars| {
                Ok(format!(
                    "Roses are red, violets are blue, {} is hard, so is this test.",
                    vars.input()
                ))
            })
            .with_parameter(ParameterView::new("input", "The topic of the poem.")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ContextVariables;

    fn function(name: &str) -> KernelFunction {
        EmailPluginFake
            .functions()
            .into_iter()
            .find(|f| f.name() == name)
            .unwrap()
    }

    #[test]
    fn test_send_email() {
        let mut vars = ContextVariables::with_input("Hello Kai");
        vars.set("email_address", "kai@example.com");
        assert_eq!(
            function("SendEmail").invoke(&vars).unwrap(),
            "Sent email to: kai@example.com. Body: Hello Kai"
        );
    }

    #[test]
    fn test_send_email_requires_address() {
        let vars = ContextVariables::with_input("Hello Kai");
        assert!(function("SendEmail").invoke(&vars).is_err());
    }

    #[test]
    fn test_get_email_address() {
        let vars = ContextVariables::with_input("Kai");
        assert_eq!(function("GetEmailAddress").invoke(&vars).unwrap(), "Kai@example.com");
    }
}
