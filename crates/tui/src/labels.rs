use guandan_core::{Hint, Language, TeamId};

/// Every visible string for one language.
#[derive(Debug)]
pub struct Labels {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub team_a: &'static str,
    pub team_b: &'static str,
    pub level: &'static str,
    pub wins: &'static str,
    pub stage: &'static str,
    pub no_stage: &'static str,
    pub toggle_stage: &'static str,
    pub next_round: &'static str,
    pub hold: &'static str,
    pub hold_hint: &'static str,
    pub rename_prompt: &'static str,
    pub large_digits: &'static str,
    pub language_switch: &'static str,
    pub sound: &'static str,
    pub keep_awake: &'static str,
    pub stage_locked: &'static str,
    pub edit_hint: &'static str,
    pub rename_help: &'static str,
    pub key_help: &'static str,
    pub ready: &'static str,
}

static ZH: Labels = Labels {
    title: "掼蛋记分牌",
    subtitle: "终端记分版（本地保存）",
    team_a: "A队",
    team_b: "B队",
    level: "级数",
    wins: "已赢局数",
    stage: "上台",
    no_stage: "未上台",
    toggle_stage: "切换上台",
    next_round: "下一局",
    hold: "长按",
    hold_hint: "长按“下一局”仅清空级数",
    rename_prompt: "输入队名",
    large_digits: "大字",
    language_switch: "EN",
    sound: "声音",
    keep_awake: "常亮",
    stage_locked: "到2级后可切换",
    edit_hint: "点按改名，长按恢复默认",
    rename_help: "Enter 确认  Esc 取消",
    key_help: "w/s A队级数  e/d A队胜局  i/k B队级数  o/l B队胜局  空格 上台  n 下一局 (N 长按)  a/b 改名 (A/B 恢复)  1-4 设置  Q 退出",
    ready: "就绪",
};

static EN: Labels = Labels {
    title: "Guandan Scoreboard",
    subtitle: "Terminal Edition (Local Storage)",
    team_a: "Team A",
    team_b: "Team B",
    level: "Level",
    wins: "Wins",
    stage: "ON",
    no_stage: "No Stage",
    toggle_stage: "Toggle Stage",
    next_round: "Next Round",
    hold: "Hold",
    hold_hint: "Long-press Next Round to clear levels only",
    rename_prompt: "Team name",
    large_digits: "A+",
    language_switch: "中文",
    sound: "Sound",
    keep_awake: "Awake",
    stage_locked: "Available after level 2",
    edit_hint: "Tap rename, hold reset",
    rename_help: "Enter confirm  Esc cancel",
    key_help: "w/s level A  e/d wins A  i/k level B  o/l wins B  space stage  n next round (N hold)  a/b rename (A/B reset)  1-4 prefs  Q quit",
    ready: "Ready",
};

impl Labels {
    pub fn for_language(language: Language) -> &'static Labels {
        match language {
            Language::Zh => &ZH,
            Language::En => &EN,
        }
    }

    pub fn default_team_name(&self, team: TeamId) -> &'static str {
        match team {
            TeamId::A => self.team_a,
            TeamId::B => self.team_b,
        }
    }

    pub fn hint(&self, hint: Hint) -> &'static str {
        match hint {
            Hint::StageUnavailable => self.stage_locked,
            Hint::HoldForNextRound => self.hold_hint,
        }
    }
}
