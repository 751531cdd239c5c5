//! User-facing strings for the chat front end and the record labels.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Arabic,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "en" | "english" => Some(Language::English),
            "ar" | "arabic" => Some(Language::Arabic),
            _ => None,
        }
    }

    /// "<N> minutes ago" below one hour, "<N> hours ago" otherwise.
    /// Truncates; negative elapsed time counts as zero.
    pub fn time_ago(self, elapsed: chrono::Duration) -> String {
        let seconds = elapsed.num_seconds().max(0);
        if seconds < 3600 {
            let minutes = seconds / 60;
            match self {
                Language::English => format!("{} minutes ago", minutes),
                Language::Arabic => format!("{} دقائق مضت", minutes),
            }
        } else {
            let hours = seconds / 3600;
            match self {
                Language::English => format!("{} hours ago", hours),
                Language::Arabic => format!("{} ساعات مضت", hours),
            }
        }
    }

    pub fn password_prompt(self) -> &'static str {
        match self {
            Language::English => "🔒 Please enter the password:",
            Language::Arabic => "🔒 من فضلك أدخل كلمة المرور:",
        }
    }

    pub fn wrong_password(self) -> &'static str {
        match self {
            Language::English => "❌ Incorrect password. Please try again.",
            Language::Arabic => "❌ كلمة المرور غير صحيحة. حاول مرة أخرى.",
        }
    }

    pub fn profile_prompt(self) -> &'static str {
        match self {
            Language::English => "👤 Please enter the profile name:",
            Language::Arabic => "👤 من فضلك أدخل اسم الملف الشخصي:",
        }
    }

    pub fn checking(self, profile: &str) -> String {
        match self {
            Language::English => format!("🔍 Checking codes and links for {}...", profile),
            Language::Arabic => format!("🔍 جاري التحقق من الروابط والأكواد لحساب {}...", profile),
        }
    }

    pub fn still_checking(self) -> &'static str {
        match self {
            Language::English => "⏳ Still checking, please wait...",
            Language::Arabic => "⏳ جاري التحقق، يرجى الانتظار...",
        }
    }

    pub fn finished(self) -> &'static str {
        match self {
            Language::English => "✅ Done. Type /start to check again.",
            Language::Arabic => "✅ تم الانتهاء. اكتب /start للبدء من جديد.",
        }
    }

    pub fn nothing_found(self) -> &'static str {
        match self {
            Language::English => "❌ No codes or links available.",
            Language::Arabic => "❌ لا توجد أكواد أو روابط متاحة.",
        }
    }

    pub fn run_failed(self) -> &'static str {
        match self {
            Language::English => "⚠️ An error occurred while checking emails.",
            Language::Arabic => "⚠️ حدث خطأ أثناء التحقق من البريد.",
        }
    }

    pub fn start_hint(self) -> &'static str {
        match self {
            Language::English => "Type /start to check for codes.",
            Language::Arabic => "اكتب /start للبدء.",
        }
    }

    pub fn profile_label(self) -> &'static str {
        match self {
            Language::English => "Profile",
            Language::Arabic => "الملف الشخصي",
        }
    }

    pub fn type_label(self) -> &'static str {
        match self {
            Language::English => "Type",
            Language::Arabic => "النوع",
        }
    }

    pub fn time_label(self) -> &'static str {
        match self {
            Language::English => "Time",
            Language::Arabic => "الوقت",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Language::English => "🔗 Click here",
            Language::Arabic => "🔗 اضغط هنا",
        }
    }
}
